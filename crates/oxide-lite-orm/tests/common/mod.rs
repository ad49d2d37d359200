//! Common test utilities for the oxide-lite-orm integration tests.

#![allow(dead_code)]

use oxide_lite_core::nodes::CreateTableNode;
use oxide_lite_core::prelude::*;
use oxide_lite_orm::{Database, DatabaseConfig};

/// Declares the library schema: authors write books, books carry tags.
pub fn library() -> Registry {
    let mut registry = Registry::new();
    registry
        .declare(
            TableBuilder::new("author")
                .field(Field::char("name", 100))
                .field(Field::integer("age").null(true))
                .ordering(&["name"])
                .str_field("name"),
        )
        .expect("Failed to declare author");
    registry
        .declare(
            TableBuilder::new("book")
                .field(Field::char("title", 200))
                .field(Field::float("price").null(true)),
        )
        .expect("Failed to declare book");
    registry
        .declare(TableBuilder::new("tag").field(Field::char("label", 50).unique()))
        .expect("Failed to declare tag");
    registry
        .relate(Relationship::foreign_key("author", "book").related_name("books"))
        .expect("Failed to relate author and book");
    registry
        .relate(Relationship::many_to_many("book", "tag"))
        .expect("Failed to relate book and tag");
    registry
}

/// Opens an in-memory database and creates every declared table.
pub async fn create_test_db(registry: Registry) -> Database {
    let db = Database::connect(&DatabaseConfig::memory(), registry)
        .await
        .expect("Failed to create in-memory SQLite pool");
    for table in db.registry().tables() {
        let sql = CreateTableNode::from_table(table, db.backend()).to_sql(db.backend());
        sqlx::query(&sql)
            .execute(db.pool())
            .await
            .expect("Failed to create table");
    }
    db
}

/// Fills the library with three authors, four books and two tags.
pub async fn seed(db: &Database) {
    let authors = db.objects("author").unwrap();
    let hugo = authors
        .create(&[("name", "Victor Hugo".into()), ("age", 83_i64.into())])
        .await
        .unwrap();
    let dumas = authors
        .create(&[("name", "Alexandre Dumas".into()), ("age", 68_i64.into())])
        .await
        .unwrap();
    authors.create(&[("name", "Kendall Ross".into())]).await.unwrap();

    let books = db.objects("book").unwrap();
    let written = books
        .bulk_create(&[
            vec![
                ("title", "Les Miserables".into()),
                ("price", 12.5.into()),
                ("author_id", hugo.pk().unwrap().into()),
            ],
            vec![
                ("title", "Notre-Dame de Paris".into()),
                ("price", 9.5.into()),
                ("author_id", hugo.pk().unwrap().into()),
            ],
            vec![
                ("title", "Les Trois Mousquetaires".into()),
                ("price", 8.0.into()),
                ("author_id", dumas.pk().unwrap().into()),
            ],
            vec![
                ("title", "Le Comte de Monte-Cristo".into()),
                ("price", 14.0.into()),
                ("author_id", dumas.pk().unwrap().into()),
            ],
        ])
        .await
        .unwrap();

    let tags = db.objects("tag").unwrap();
    let classic = tags.create(&[("label", "classic".into())]).await.unwrap();
    let adventure = tags.create(&[("label", "adventure".into())]).await.unwrap();
    for book in &written {
        book.link(db, "tag", &classic).await.unwrap();
    }
    written[2].link(db, "tag", &adventure).await.unwrap();
    written[3].link(db, "tag", &adventure).await.unwrap();
}
