// Database connection and schema bootstrap

use sea_orm::sea_query::{Index, IndexCreateStatement, TableCreateStatement};
use sea_orm::{ConnectionTrait, Database, DatabaseConnection, DbErr, Schema};

use crate::models::{category, comment, genre, review, title, title_genre, users};

pub async fn establish_connection(database_url: &str) -> Result<DatabaseConnection, DbErr> {
    Database::connect(database_url).await
}

/// Creates every table plus the composite unique index guarding the
/// one-review-per-(author, title) rule. Idempotent, safe to run at every
/// startup. Tables are created in dependency order so foreign keys resolve.
pub async fn init_schema(db: &DatabaseConnection) -> Result<(), DbErr> {
    let backend = db.get_database_backend();
    let schema = Schema::new(backend);

    let tables: Vec<TableCreateStatement> = vec![
        schema.create_table_from_entity(users::Entity),
        schema.create_table_from_entity(category::Entity),
        schema.create_table_from_entity(genre::Entity),
        schema.create_table_from_entity(title::Entity),
        schema.create_table_from_entity(title_genre::Entity),
        schema.create_table_from_entity(review::Entity),
        schema.create_table_from_entity(comment::Entity),
    ];
    for mut table in tables {
        table.if_not_exists();
        db.execute(backend.build(&table)).await?;
    }

    let review_unique: IndexCreateStatement = Index::create()
        .name("uq_reviews_author_title")
        .table(review::Entity)
        .col(review::Column::AuthorId)
        .col(review::Column::TitleId)
        .unique()
        .if_not_exists()
        .to_owned();
    db.execute(backend.build(&review_unique)).await?;

    Ok(())
}
