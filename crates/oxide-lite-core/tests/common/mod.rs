#![allow(dead_code)]

use oxide_lite_core::prelude::*;

pub fn render(q: &Q) -> String {
    Resolver::detached()
        .resolve(q)
        .unwrap_or_else(|e| panic!("Failed to resolve {q:?}: {e}"))
        .condition
        .map(|condition| condition.to_sql(&SqliteBackend::new()))
        .unwrap_or_default()
}

/// A small library schema: authors write books, books carry tags.
pub fn library() -> Registry {
    let mut registry = Registry::new();
    registry
        .declare(
            TableBuilder::new("author")
                .field(Field::char("name", 100))
                .field(Field::integer("age").null(true)),
        )
        .unwrap();
    registry
        .declare(
            TableBuilder::new("book")
                .field(Field::char("title", 200))
                .field(Field::date("published").null(true)),
        )
        .unwrap();
    registry
        .declare(TableBuilder::new("tag").field(Field::char("label", 50).unique()))
        .unwrap();
    registry
        .relate(Relationship::foreign_key("author", "book").related_name("books"))
        .unwrap();
    registry
        .relate(Relationship::many_to_many("book", "tag"))
        .unwrap();
    registry
}
