//! Integration tests for lazy query sets, rows and managers against an
//! in-memory SQLite database.

mod common;

use common::{create_test_db, library, seed};
use oxide_lite_core::nodes::DeleteNode;
use oxide_lite_core::prelude::*;
use oxide_lite_orm::{OrmError, Query, QueryState};

fn close(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-9
}

#[tokio::test]
async fn test_queryset_is_lazy_until_fetched() {
    let db = create_test_db(library()).await;
    seed(&db).await;

    let older = db
        .objects("author")
        .unwrap()
        .filter(Q::lookup("age__gt", 70))
        .unwrap();
    assert!(!older.is_evaluated());
    assert_eq!(
        older.sql_statement().unwrap(),
        "SELECT * FROM author WHERE age > 70 ORDER BY name ASC"
    );
    assert!(!older.is_evaluated());

    let rows = older.fetch().await.unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].get("name"), Some(&SqlValue::from("Victor Hugo")));
    assert!(older.is_evaluated());
}

#[tokio::test]
async fn test_chaining_leaves_the_parent_untouched() {
    let db = create_test_db(library()).await;
    seed(&db).await;

    let authors = db.objects("author").unwrap().all().unwrap();
    let named_k = authors.filter(Q::lookup("name__startswith", "K")).unwrap();

    assert_eq!(named_k.count().await.unwrap(), 1);
    assert_eq!(authors.count().await.unwrap(), 3);
    assert!(!authors.is_evaluated());
}

#[tokio::test]
async fn test_default_ordering_and_override() {
    let db = create_test_db(library()).await;
    seed(&db).await;

    let authors = db.objects("author").unwrap();
    let names: Vec<_> = authors
        .all()
        .unwrap()
        .all()
        .await
        .unwrap()
        .iter()
        .map(|row| row.get("name").cloned().unwrap())
        .collect();
    assert_eq!(
        names,
        vec![
            SqlValue::from("Alexandre Dumas"),
            SqlValue::from("Kendall Ross"),
            SqlValue::from("Victor Hugo"),
        ]
    );

    let reversed = authors.order_by(&["-name"]).unwrap();
    let first = reversed.first().await.unwrap().unwrap();
    assert_eq!(first.get("name"), Some(&SqlValue::from("Victor Hugo")));
}

#[tokio::test]
async fn test_explicit_ordering_replaces_the_default() {
    let db = create_test_db(library()).await;
    seed(&db).await;

    let authors = db.objects("author").unwrap();
    let by_age = authors.order_by(&["-age"]).unwrap();
    assert_eq!(
        by_age.sql_statement().unwrap(),
        "SELECT * FROM author ORDER BY age DESC"
    );
    let names: Vec<_> = by_age
        .all()
        .await
        .unwrap()
        .iter()
        .map(|row| row.get("name").cloned().unwrap())
        .collect();
    assert_eq!(
        names,
        vec![
            SqlValue::from("Victor Hugo"),
            SqlValue::from("Alexandre Dumas"),
            SqlValue::from("Kendall Ross"),
        ]
    );

    let then_by_name = by_age.order_by(&["name"]).unwrap();
    assert_eq!(
        then_by_name.sql_statement().unwrap(),
        "SELECT * FROM author ORDER BY age DESC, name ASC"
    );

    let filtered = authors
        .filter(Q::lookup("age__isnull", false))
        .unwrap()
        .order_by(&["age"])
        .unwrap();
    assert_eq!(
        filtered.sql_statement().unwrap(),
        "SELECT * FROM author WHERE age IS NOT NULL ORDER BY age ASC"
    );
}

#[tokio::test]
async fn test_declared_primary_key_is_used_for_rows() {
    let mut registry = Registry::new();
    registry
        .declare(
            TableBuilder::new("country")
                .field(Field::integer("code").primary_key())
                .field(Field::char("name", 100))
                .str_field("name"),
        )
        .unwrap();
    registry
        .declare(TableBuilder::new("city").field(Field::char("name", 100)))
        .unwrap();
    registry
        .relate(Relationship::foreign_key("country", "city").related_name("cities"))
        .unwrap();
    let db = create_test_db(registry).await;

    let countries = db.objects("country").unwrap();
    let mut france = countries
        .create(&[("code", 33_i64.into()), ("name", "France".into())])
        .await
        .unwrap();
    assert_eq!(france.primary_key(), "code");
    assert_eq!(france.pk(), Some(33));

    let cities = db.objects("city").unwrap();
    let paris = cities
        .create(&[("name", "Paris".into()), ("country_id", 33_i64.into())])
        .await
        .unwrap();
    let owner = paris.related(&db, "country").unwrap();
    assert_eq!(owner.first().await.unwrap().unwrap().pk(), Some(33));
    let listed = france.related(&db, "cities").unwrap();
    assert_eq!(listed.count().await.unwrap(), 1);

    let joined = cities.filter(Q::lookup("country__name", "France")).unwrap();
    assert_eq!(
        joined.sql_statement().unwrap(),
        "SELECT city.* FROM city INNER JOIN country ON country.code = city.country_id \
         WHERE country.name = 'France'"
    );
    assert_eq!(joined.count().await.unwrap(), 1);

    france.set("name", "République française").unwrap();
    assert_eq!(france.save(&db).await.unwrap(), 1);
    let renamed = countries.get(Q::lookup("code", 33)).await.unwrap();
    assert_eq!(renamed.to_string(), "<country: République française>");

    assert_eq!(
        countries
            .filter(Q::lookup("cities__name", "Paris"))
            .unwrap()
            .delete()
            .await
            .unwrap(),
        1
    );
    assert_eq!(countries.count().await.unwrap(), 0);
}

#[tokio::test]
async fn test_order_by_rejects_unknown_fields() {
    let db = create_test_db(library()).await;
    let result = db.objects("author").unwrap().order_by(&["nickname"]);
    assert!(matches!(
        result,
        Err(OrmError::Core(CoreError::InvalidReference(_)))
    ));
}

#[tokio::test]
async fn test_count_and_exists() {
    let db = create_test_db(library()).await;
    seed(&db).await;

    let books = db.objects("book").unwrap();
    let cheap = books.filter(Q::lookup("price__lt", 10.0)).unwrap();
    assert_eq!(cheap.count().await.unwrap(), 2);
    assert!(cheap.exists().await.unwrap());
    assert!(!cheap.is_evaluated());

    let none = books.filter(Q::lookup("price__gt", 100.0)).unwrap();
    assert!(!none.exists().await.unwrap());
    assert_eq!(none.count().await.unwrap(), 0);
}

#[tokio::test]
async fn test_count_uses_fetched_rows() {
    let db = create_test_db(library()).await;
    seed(&db).await;

    let books = db.objects("book").unwrap().all().unwrap();
    books.fetch().await.unwrap();

    // Rows added after the fetch are not seen by the cached set.
    db.objects("book")
        .unwrap()
        .create(&[("title", "Quatrevingt-treize".into())])
        .await
        .unwrap();
    assert_eq!(books.count().await.unwrap(), 4);
    assert_eq!(db.objects("book").unwrap().count().await.unwrap(), 5);
}

#[tokio::test]
async fn test_forward_traversal_adds_a_join() {
    let db = create_test_db(library()).await;
    seed(&db).await;

    let by_hugo = db
        .objects("book")
        .unwrap()
        .filter(Q::lookup("author__name", "Victor Hugo"))
        .unwrap();
    assert_eq!(
        by_hugo.sql_statement().unwrap(),
        "SELECT book.* FROM book INNER JOIN author ON author.id = book.author_id \
         WHERE author.name = 'Victor Hugo'"
    );
    assert_eq!(by_hugo.count().await.unwrap(), 2);
}

#[tokio::test]
async fn test_backward_traversal() {
    let db = create_test_db(library()).await;
    seed(&db).await;

    let expensive_authors = db
        .objects("author")
        .unwrap()
        .filter(Q::lookup("books__price__gt", 13.0))
        .unwrap();
    let rows = expensive_authors.all().await.unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].get("name"), Some(&SqlValue::from("Alexandre Dumas")));
}

#[tokio::test]
async fn test_related_rows() {
    let db = create_test_db(library()).await;
    seed(&db).await;

    let authors = db.objects("author").unwrap();
    let hugo = authors.get(Q::lookup("name", "Victor Hugo")).await.unwrap();
    assert_eq!(hugo.related(&db, "books").unwrap().count().await.unwrap(), 2);

    let books = db.objects("book").unwrap();
    let musketeers = books
        .get(Q::lookup("title__contains", "Mousquetaires"))
        .await
        .unwrap();
    let author = musketeers.related(&db, "author").unwrap();
    assert_eq!(
        author.first().await.unwrap().unwrap().get("name"),
        Some(&SqlValue::from("Alexandre Dumas"))
    );
    assert_eq!(musketeers.related(&db, "tag").unwrap().count().await.unwrap(), 2);

    let tags = db.objects("tag").unwrap();
    let classic = tags.get(Q::lookup("label", "classic")).await.unwrap();
    assert_eq!(classic.related(&db, "book_set").unwrap().count().await.unwrap(), 4);

    assert!(matches!(
        hugo.related(&db, "publisher"),
        Err(OrmError::Core(CoreError::InvalidReference(_)))
    ));
}

#[tokio::test]
async fn test_get_requires_exactly_one_row() {
    let db = create_test_db(library()).await;
    seed(&db).await;

    let books = db.objects("book").unwrap();
    assert!(matches!(
        books.get(Q::lookup("title", "Hernani")).await,
        Err(OrmError::NotFound(table)) if table == "book"
    ));
    assert!(matches!(
        books.get(Q::lookup("title__startswith", "Les")).await,
        Err(OrmError::MultipleObjectsReturned(table, 2)) if table == "book"
    ));
}

#[tokio::test]
async fn test_get_or_create_and_update_or_create() {
    let db = create_test_db(library()).await;
    seed(&db).await;

    let tags = db.objects("tag").unwrap();
    let (poetry, created) = tags
        .get_or_create(&[("label", "poetry".into())], &[])
        .await
        .unwrap();
    assert!(created);
    let (again, created) = tags
        .get_or_create(&[("label", "poetry".into())], &[])
        .await
        .unwrap();
    assert!(!created);
    assert_eq!(poetry.pk(), again.pk());

    let authors = db.objects("author").unwrap();
    let (kendall, created) = authors
        .update_or_create(&[("name", "Kendall Ross".into())], &[("age", 31_i64.into())])
        .await
        .unwrap();
    assert!(!created);
    assert_eq!(kendall.get("age"), Some(&SqlValue::Int(31)));
    let stored = authors.get(Q::lookup("name", "Kendall Ross")).await.unwrap();
    assert_eq!(stored.get("age"), Some(&SqlValue::Int(31)));
}

#[tokio::test]
async fn test_row_save_and_delete() {
    let db = create_test_db(library()).await;
    seed(&db).await;

    let authors = db.objects("author").unwrap();
    let mut hugo = authors.get(Q::lookup("name", "Victor Hugo")).await.unwrap();
    hugo.set("age", 84).unwrap();
    assert_eq!(hugo.save(&db).await.unwrap(), 1);
    let reloaded = authors.get(Q::lookup("age", 84)).await.unwrap();
    assert_eq!(reloaded.pk(), hugo.pk());
    assert_eq!(reloaded.to_string(), "<author: Victor Hugo>");

    let kendall = authors.get(Q::lookup("name", "Kendall Ross")).await.unwrap();
    assert_eq!(kendall.delete(&db).await.unwrap(), 1);
    assert_eq!(authors.count().await.unwrap(), 2);
}

#[tokio::test]
async fn test_bulk_update_and_delete() {
    let db = create_test_db(library()).await;
    seed(&db).await;

    let books = db.objects("book").unwrap();
    let by_dumas = books
        .filter(Q::lookup("author__name", "Alexandre Dumas"))
        .unwrap();
    let changed = by_dumas
        .update(vec![("price", Expr::from(5.0))])
        .await
        .unwrap();
    assert_eq!(changed, 2);
    assert_eq!(
        books
            .filter(Q::lookup("price", 5.0))
            .unwrap()
            .count()
            .await
            .unwrap(),
        2
    );

    let deleted = books
        .filter(Q::lookup("price__lt", 10.0))
        .unwrap()
        .delete()
        .await
        .unwrap();
    assert_eq!(deleted, 3);
    assert_eq!(books.count().await.unwrap(), 1);
}

#[tokio::test]
async fn test_write_query_runs_once() {
    let db = create_test_db(library()).await;
    seed(&db).await;

    let mut query = Query::new("tag").node(DeleteNode::new("tag").unwrap());
    query.run(&db).await.unwrap();
    assert_eq!(query.state(), QueryState::Executed);
    assert_eq!(query.rows_affected(), 2);

    assert!(matches!(
        query.run(&db).await,
        Err(OrmError::AlreadyExecuted(kind, table)) if kind == "delete" && table == "tag"
    ));
}

#[tokio::test]
async fn test_aggregates() {
    let db = create_test_db(library()).await;
    seed(&db).await;

    let books = db.objects("book").unwrap();
    let results = books
        .aggregate(&[
            Aggregate::avg(col("price").unwrap()),
            Aggregate::count_all(),
            Aggregate::variance(col("price").unwrap()),
            Aggregate::mean_absolute_difference(col("price").unwrap()),
        ])
        .await
        .unwrap();

    assert_eq!(results[0].0, "price__avg");
    assert!(close(results[0].1.as_f64().unwrap(), 11.0));
    assert_eq!(results[1], (String::from("count"), SqlValue::Int(4)));
    assert!(close(results[2].1.as_f64().unwrap(), 5.625));
    assert!(close(results[3].1.as_f64().unwrap(), 2.25));
}

#[tokio::test]
async fn test_annotate_and_values() {
    let db = create_test_db(library()).await;
    seed(&db).await;

    let authors = db.objects("author").unwrap();
    let shouted = authors
        .annotate("shout", upper(col("name").unwrap()))
        .unwrap();
    let first = shouted.first().await.unwrap().unwrap();
    assert_eq!(first.get("shout"), Some(&SqlValue::from("ALEXANDRE DUMAS")));

    assert!(matches!(
        authors.annotate("name", upper(col("name").unwrap())),
        Err(OrmError::Core(CoreError::Structure(_)))
    ));

    let values = authors.all().unwrap().values(&["name"]).await.unwrap();
    assert_eq!(values.len(), 3);
    assert_eq!(
        values[2],
        vec![(String::from("name"), SqlValue::from("Victor Hugo"))]
    );
}

#[tokio::test]
async fn test_window_and_text_annotations() {
    let db = create_test_db(library()).await;
    seed(&db).await;

    let ranked = db
        .objects("author")
        .unwrap()
        .annotate(
            "seniority",
            Window::new(WindowFunc::Rank).ordered(&["-age"]).unwrap(),
        )
        .unwrap()
        .annotate("initials", substr(col("name").unwrap(), 1, 3).unwrap())
        .unwrap();
    assert_eq!(
        ranked.sql_statement().unwrap(),
        "SELECT *, rank() OVER (ORDER BY age DESC) AS seniority, substr(name, 1, 3) AS initials \
         FROM author ORDER BY name ASC"
    );
    let rows = ranked.all().await.unwrap();
    let seniority: Vec<_> = rows.iter().map(|row| row.get("seniority").cloned()).collect();
    assert_eq!(
        seniority,
        vec![Some(SqlValue::Int(2)), Some(SqlValue::Int(3)), Some(SqlValue::Int(1))]
    );
    assert_eq!(rows[0].get("initials"), Some(&SqlValue::from("Ale")));

    let previous = db
        .objects("book")
        .unwrap()
        .annotate(
            "cheaper",
            lag(col("title").unwrap(), 1).ordered(&["-price"]).unwrap(),
        )
        .unwrap()
        .order_by(&["-price"])
        .unwrap();
    let rows = previous.all().await.unwrap();
    assert_eq!(rows[0].get("cheaper"), Some(&SqlValue::Null));
    assert_eq!(
        rows[1].get("cheaper"),
        Some(&SqlValue::from("Le Comte de Monte-Cristo"))
    );
}

#[tokio::test]
async fn test_annotated_count_over_a_join() {
    let db = create_test_db(library()).await;
    seed(&db).await;

    let prolific = db
        .objects("author")
        .unwrap()
        .filter(Q::lookup("books__price__gt", 0.0))
        .unwrap()
        .annotate("written", Aggregate::count(col("book.id").unwrap()))
        .unwrap();
    let rows = prolific.all().await.unwrap();
    assert_eq!(rows.len(), 2);
    assert!(rows
        .iter()
        .all(|row| row.get("written") == Some(&SqlValue::Int(2))));
}

#[tokio::test]
async fn test_regex_lookup() {
    let db = create_test_db(library()).await;
    seed(&db).await;

    let authors = db.objects("author").unwrap();
    let matching = authors
        .filter(Q::lookup("name__regex", "^(Victor|Kendall) "))
        .unwrap();
    assert_eq!(matching.count().await.unwrap(), 2);
}

#[tokio::test]
async fn test_exclude_and_or() {
    let db = create_test_db(library()).await;
    seed(&db).await;

    let books = db.objects("book").unwrap();
    let either = books
        .filter(Q::lookup("price__lt", 9.0) | Q::lookup("price__gt", 13.0))
        .unwrap();
    assert_eq!(either.count().await.unwrap(), 2);

    let rest = books
        .exclude(Q::lookup("price__lt", 9.0) | Q::lookup("price__gt", 13.0))
        .unwrap();
    assert_eq!(rest.count().await.unwrap(), 2);
}

#[tokio::test]
async fn test_manager_first_last_and_slicing() {
    let db = create_test_db(library()).await;
    seed(&db).await;

    let books = db.objects("book").unwrap();
    let first = books.first().await.unwrap().unwrap();
    let last = books.last().await.unwrap().unwrap();
    assert!(first.pk() < last.pk());

    let page = books.order_by(&["price"]).unwrap().offset(1).limit(2);
    let titles: Vec<_> = page
        .all()
        .await
        .unwrap()
        .into_iter()
        .map(|row| row.get("title").cloned().unwrap())
        .collect();
    assert_eq!(
        titles,
        vec![
            SqlValue::from("Notre-Dame de Paris"),
            SqlValue::from("Les Miserables"),
        ]
    );
}
