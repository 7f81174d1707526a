#![allow(dead_code)]

use restcontroller::{Controller, ModelDef, ModelRegistry, Options, RestQuery};
use sea_orm::{ConnectionTrait, Database, DatabaseConnection, DbErr};
use sea_orm_migration::prelude::*;
use std::sync::Arc;

pub const ADA_UUID: &str = "6f1c2a3e-9d4b-4c8e-a1f2-3b4c5d6e7f80";
pub const GRACE_UUID: &str = "0a9b8c7d-6e5f-4a3b-9c2d-1e0f2a3b4c5d";

pub async fn setup_test_db() -> Result<DatabaseConnection, DbErr> {
    let db = Database::connect("sqlite::memory:").await?;

    // Run migrations
    Migrator::up(&db, None).await?;

    Ok(db)
}

/// Two authors and five posts:
///
/// | id | title          | author | published | priority |
/// |----|----------------|--------|-----------|----------|
/// | 1  | Rust ownership | ada    | yes       | 3        |
/// | 2  | Async Rust     | ada    | no        | 5        |
/// | 3  | COBOL tips     | grace  | yes       | 1        |
/// | 4  | Compilers      | grace  | yes       | 4        |
/// | 5  | Drafts         | -      | no        | 2        |
pub async fn setup_seeded_db() -> Result<DatabaseConnection, DbErr> {
    let db = setup_test_db().await?;
    db.execute_unprepared(&format!(
        "INSERT INTO authors (id, uuid, handle, name) VALUES \
         (1, '{ADA_UUID}', 'ada', 'Ada Lovelace'), \
         (2, '{GRACE_UUID}', 'grace', 'Grace Hopper')"
    ))
    .await?;
    db.execute_unprepared(
        "INSERT INTO posts (id, title, body, author_id, published, priority) VALUES \
         (1, 'Rust ownership', 'borrowing explained', 1, 1, 3), \
         (2, 'Async Rust', 'futures and tasks', 1, 0, 5), \
         (3, 'COBOL tips', 'legacy systems', 2, 1, 1), \
         (4, 'Compilers', 'from rust to cobol', 2, 1, 4), \
         (5, 'Drafts', NULL, NULL, 0, 2)",
    )
    .await?;
    Ok(db)
}

pub fn registry() -> Arc<ModelRegistry> {
    let mut registry = ModelRegistry::new();
    registry
        .register(
            ModelDef::new("authors", "authors", ["id", "uuid", "handle", "name"])
                .alias_column("handle")
                .uuid_column("uuid"),
        )
        .unwrap()
        .register(
            ModelDef::new(
                "posts",
                "posts",
                ["id", "title", "body", "author_id", "published", "priority"],
            )
            .belongs_to("author", "authors", "author_id"),
        )
        .unwrap();
    Arc::new(registry)
}

pub fn posts_options() -> Options {
    Options::new("posts")
        .scope_models(["authors"])
        .search_fields(["title", "body"])
        .restricted_fields(["published"])
        .page_size(10)
}

pub fn posts_query(db: DatabaseConnection, options: Options) -> RestQuery {
    RestQuery::new(db, registry(), options).expect("valid options")
}

pub fn posts_controller(db: DatabaseConnection) -> Controller {
    Controller::new(posts_query(db, posts_options()))
}

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![Box::new(CreateBlogTables)]
    }
}

pub struct CreateBlogTables;

#[async_trait::async_trait]
impl MigrationName for CreateBlogTables {
    fn name(&self) -> &'static str {
        "m20240101_000001_create_blog_tables"
    }
}

#[async_trait::async_trait]
impl MigrationTrait for CreateBlogTables {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Authors::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Authors::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Authors::Uuid).string().not_null().unique_key())
                    .col(ColumnDef::new(Authors::Handle).string().not_null().unique_key())
                    .col(ColumnDef::new(Authors::Name).string().not_null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Posts::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Posts::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Posts::Title).string().not_null().unique_key())
                    .col(ColumnDef::new(Posts::Body).text().null())
                    .col(ColumnDef::new(Posts::AuthorId).integer().null())
                    .col(
                        ColumnDef::new(Posts::Published)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(ColumnDef::new(Posts::Priority).integer().not_null().default(0))
                    .foreign_key(
                        ForeignKey::create()
                            .from(Posts::Table, Posts::AuthorId)
                            .to(Authors::Table, Authors::Id),
                    )
                    .to_owned(),
            )
            .await?;
        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Posts::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Authors::Table).to_owned())
            .await?;
        Ok(())
    }
}

#[derive(DeriveIden)]
enum Authors {
    Table,
    Id,
    Uuid,
    Handle,
    Name,
}

#[derive(DeriveIden)]
enum Posts {
    Table,
    Id,
    Title,
    Body,
    AuthorId,
    Published,
    Priority,
}
