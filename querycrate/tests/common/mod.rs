#![allow(dead_code)]

use axum::{Router, body::Body, http::Request, http::StatusCode};
use querycrate::{AppState, CustomFilterInput, QueryRegistry, ResourceQuery, router};
use sea_orm::{
    ActiveValue::Set, ColumnTrait, Database, DatabaseConnection, DbErr, EntityTrait, Order,
    QueryFilter, Select,
};
use sea_orm_migration::prelude::*;
use serde_json::Value;
use tower::ServiceExt;

pub mod comment_entity;
pub mod user_entity;

pub const SEED_USERS: [(&str, &str, bool); 6] = [
    ("andre", "tata", true),
    ("mathieu", "toto", true),
    ("bobol", "titi", false),
    ("fred", "gratti", true),
    ("jeanne", "zapata", false),
    ("angie", "tutu", true),
];

/// (`user_id`, content)
pub const SEED_COMMENTS: [(i32, &str); 4] = [
    (1, "first!"),
    (4, "nice"),
    (4, "agreed"),
    (5, "meh"),
];

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .compact()
        .try_init();
}

pub async fn setup_test_db() -> Result<DatabaseConnection, DbErr> {
    let db = Database::connect("sqlite::memory:").await?;

    // Run migrations
    Migrator::up(&db, None).await?;

    user_entity::Entity::insert_many(SEED_USERS.iter().map(|(login, email, active)| {
        user_entity::ActiveModel {
            login: Set((*login).to_owned()),
            email: Set((*email).to_owned()),
            active: Set(*active),
            ..Default::default()
        }
    }))
    .exec(&db)
    .await?;

    comment_entity::Entity::insert_many(SEED_COMMENTS.iter().map(|(user_id, content)| {
        comment_entity::ActiveModel {
            user_id: Set(*user_id),
            content: Set((*content).to_owned()),
            ..Default::default()
        }
    }))
    .exec(&db)
    .await?;

    Ok(db)
}

/// Users that have (`true`) or don't have (`false`) at least one comment.
pub fn has_comments(
    select: Select<user_entity::Entity>,
    values: &[String],
) -> Select<user_entity::Entity> {
    let commenters = Query::select()
        .column(comment_entity::Column::UserId)
        .from(comment_entity::Entity)
        .to_owned();

    if values.iter().any(|value| value == "false") {
        select.filter(user_entity::Column::Id.not_in_subquery(commenters))
    } else {
        select.filter(user_entity::Column::Id.in_subquery(commenters))
    }
}

pub fn users_query() -> ResourceQuery<user_entity::Entity> {
    ResourceQuery::builder()
        .custom_filter(
            "has_comments",
            CustomFilterInput::with_values(has_comments, ["true", "false"])
                .description("Users with (or without) comments"),
        )
        .custom_filter(
            "login_contains",
            CustomFilterInput::predicate(|select: Select<user_entity::Entity>, values: &[String]| {
                values.iter().fold(select, |select, value| {
                    select.filter(user_entity::Column::Login.contains(value))
                })
            }),
        )
        .build()
        .expect("valid users query configuration")
}

pub fn comments_query() -> ResourceQuery<comment_entity::Entity> {
    ResourceQuery::builder()
        .default_sort([("user_id", Order::Asc), ("id", Order::Desc)])
        .build()
        .expect("valid comments query configuration")
}

pub fn setup_test_app(db: DatabaseConnection) -> Router {
    let registry = QueryRegistry::new()
        .with(users_query())
        .and_then(|registry| registry.with(comments_query()))
        .expect("each resource is configured once");
    let state = AppState::new(db, registry);

    Router::new()
        .nest("/users", router::<user_entity::Entity>(state.clone()))
        .nest("/comments", router::<comment_entity::Entity>(state))
}

pub async fn get_json(app: &Router, uri: &str) -> (StatusCode, Value) {
    let request = Request::builder()
        .uri(uri)
        .body(Body::empty())
        .expect("valid request");
    let response = app.clone().oneshot(request).await.expect("router is infallible");
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("readable body");
    let json = serde_json::from_slice(&body).expect("JSON body");
    (status, json)
}

/// The `login` of every record in a JSON array response.
pub fn logins(body: &Value) -> Vec<String> {
    body.as_array()
        .expect("array response")
        .iter()
        .map(|user| user["login"].as_str().expect("login column").to_owned())
        .collect()
}

/// `filter[field]=value`, percent-encoded.
pub fn filter_field(field: &str, value: &str) -> String {
    format!(
        "filter%5B{field}%5D={}",
        url_escape::encode_component(value)
    )
}

/// `filter=<json>`, percent-encoded.
pub fn filter_json(json: &str) -> String {
    format!("filter={}", url_escape::encode_component(json))
}

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![Box::new(CreateUsersAndComments)]
    }
}

pub struct CreateUsersAndComments;

#[async_trait::async_trait]
impl MigrationName for CreateUsersAndComments {
    fn name(&self) -> &'static str {
        "m20240101_000001_create_users_and_comments"
    }
}

#[async_trait::async_trait]
impl MigrationTrait for CreateUsersAndComments {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Users::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Users::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Users::Login).string().not_null())
                    .col(ColumnDef::new(Users::Email).string().not_null())
                    .col(
                        ColumnDef::new(Users::Active)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Comments::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Comments::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Comments::UserId).integer().not_null())
                    .col(ColumnDef::new(Comments::Content).string().not_null())
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Comments::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Users::Table).to_owned())
            .await?;
        Ok(())
    }
}

#[derive(DeriveIden)]
enum Users {
    Table,
    Id,
    Login,
    Email,
    Active,
}

#[derive(DeriveIden)]
enum Comments {
    Table,
    Id,
    UserId,
    Content,
}
