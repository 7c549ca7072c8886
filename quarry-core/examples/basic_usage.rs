use quarry_core::builder::InsertData;
use quarry_core::executor::sqlite::SqlitePool;
use quarry_core::{col, op, Conditions, ConnectionConfig, QueryBuilder, Value};

#[tokio::main]
async fn main() -> quarry_core::Result<()> {
    let pool: SqlitePool = ConnectionConfig::memory().connect_sqlite().await?;
    let mut qb = QueryBuilder::new(&pool);

    qb.raw(
        "CREATE TABLE users (id INTEGER PRIMARY KEY, name TEXT, email TEXT, age INTEGER)",
        Vec::<Value>::new(),
    )
    .go()
    .await?;
    qb.raw(
        "CREATE TABLE posts (id INTEGER PRIMARY KEY, user_id INTEGER, title TEXT)",
        Vec::<Value>::new(),
    )
    .go()
    .await?;

    // Multi-row insert
    qb.insert(
        "users",
        InsertData::columns(["name", "email", "age"])
            .row(vec![Value::from("John"), Value::from("john@example.com"), Value::from(34)])
            .row(vec![Value::from("Jane"), Value::from("jane@example.com"), Value::from(28)])
            .row(vec![Value::from("Bob"), Value::Null, Value::from(17)]),
    );
    println!("INSERT SQL: {qb}");
    qb.go().await?;

    let id = qb
        .insert("posts", [("user_id", Value::from(1)), ("title", Value::from("Hello"))])
        .go()
        .await?;
    println!("New post id: {id}");

    // SELECT with conditions
    let adults = qb
        .select("users", "id, name, email")
        .where_(Conditions::new().push(("age", op::GTE, 18)).and(("email", "is not null")))
        .order_by("name desc")
        .all()
        .await?;
    println!("SELECT SQL: {qb}");
    for row in &adults {
        println!("  {row:?}");
    }

    // JOIN with a column-to-column comparison
    qb.select("users as u", "u.name, p.title")
        .inner_join("posts as p", ("u.id", "p.user_id"))
        .where_(("p.user_id", op::EQ, col("u.id")));
    println!("JOIN SQL: {}", qb.to_sql(false));
    println!("JOIN rows: {:?}", qb.all().await?);

    // UPDATE and DELETE
    qb.update("users", [("email", "bob@example.com")])
        .where_(("name", "Bob"));
    qb.go().await?;
    println!("Updated rows: {:?}", qb.row_count());

    qb.delete("users").where_(("age", op::LT, 18)).limit(1);
    println!("DELETE SQL (LIMIT dropped on SQLite): {}", qb.to_sql(false));
    qb.go().await?;

    println!("Users left: {}", qb.count("users", "").await?);
    println!("Has John: {}", qb.select("users", "*").where_(("name", "John")).exists().await?);

    // Errors are recorded on the builder instead of being returned by verbs
    qb.select("users", "*").join("posts", (), "full outer");
    if qb.has_error() {
        println!("Builder error: {}", qb.error_message());
    }

    Ok(())
}
