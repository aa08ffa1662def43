//! Filterable users API with Axum
//!
//! ```bash
//! cargo run --example users
//! ```
//!
//! Then visit:
//! - **All users**: <http://localhost:3000/users>
//! - **Filtered**: <http://localhost:3000/users?filter[login]=andre,fred&sort=login>
//! - **JSON filter**: <http://localhost:3000/users?filter={"has_comments":"true"}>
//! - **Capabilities**: <http://localhost:3000/users/filters>
//! - **Documentation**: <http://localhost:3000/docs>

use querycrate::resource::{CustomFilterDescription, SortDescription, SortDirection};
use querycrate::{
    AllowedFields, AppState, CustomFilterInput, IndexQuery, QueryDescription, QueryRegistry,
    ResourceQuery, router,
};
use sea_orm::sea_query::Query;
use sea_orm::{
    ConnectionTrait, Database, DatabaseConnection, QueryFilter, Select, Statement,
    entity::prelude::*,
};
use std::env;
use tower_http::trace::TraceLayer;
use utoipa::openapi::ResponseBuilder;
use utoipa::openapi::path::{HttpMethod, Operation, OperationBuilder};
use utoipa::{IntoParams, OpenApi};
use utoipa_scalar::{Scalar, Servable};

mod user {
    use sea_orm::entity::prelude::*;

    #[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
    #[sea_orm(table_name = "users")]
    pub struct Model {
        #[sea_orm(primary_key)]
        pub id: i32,
        pub login: String,
        pub email: String,
    }

    #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
    pub enum Relation {}

    impl ActiveModelBehavior for ActiveModel {}
}

mod comment {
    use sea_orm::entity::prelude::*;

    #[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
    #[sea_orm(table_name = "comments")]
    pub struct Model {
        #[sea_orm(primary_key)]
        pub id: i32,
        pub user_id: i32,
        pub content: String,
    }

    #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
    pub enum Relation {}

    impl ActiveModelBehavior for ActiveModel {}
}

#[derive(OpenApi)]
#[openapi(
    info(description = "Index endpoints with `filter` and `sort` query parameters"),
    components(schemas(QueryDescription, CustomFilterDescription, SortDescription, SortDirection))
)]
struct ApiDoc;

const SCHEMA: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS users (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        login TEXT NOT NULL,
        email TEXT NOT NULL
    );",
    "CREATE TABLE IF NOT EXISTS comments (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        user_id INTEGER NOT NULL,
        content TEXT NOT NULL
    );",
    "INSERT INTO users (login, email) VALUES
        ('andre', 'tata'), ('mathieu', 'toto'), ('bobol', 'titi'),
        ('fred', 'gratti'), ('jeanne', 'zapata'), ('angie', 'tutu');",
    "INSERT INTO comments (user_id, content) VALUES
        (1, 'first!'), (4, 'nice'), (5, 'meh');",
];

async fn seed(db: &DatabaseConnection) -> Result<(), DbErr> {
    for sql in SCHEMA {
        db.execute(Statement::from_string(db.get_database_backend(), *sql))
            .await?;
    }
    Ok(())
}

fn has_comments(select: Select<user::Entity>, values: &[String]) -> Select<user::Entity> {
    let commenters = Query::select()
        .column(comment::Column::UserId)
        .from(comment::Entity)
        .to_owned();
    match values {
        [value] if value == "false" => {
            select.filter(user::Column::Id.not_in_subquery(commenters))
        }
        _ => select.filter(user::Column::Id.in_subquery(commenters)),
    }
}

fn registry() -> Result<QueryRegistry, Box<dyn std::error::Error>> {
    let users = ResourceQuery::<user::Entity>::builder()
        .filterable(AllowedFields::except(&["email"])?)
        .custom_filter(
            "has_comments",
            CustomFilterInput::with_values(has_comments, ["true", "false"])
                .description("Users who commented at least once, or never"),
        )
        .build()?;

    let comments = ResourceQuery::<comment::Entity>::builder()
        .sortable(AllowedFields::only(&["id", "user_id"])?)
        .build()?;

    Ok(QueryRegistry::new().with(users)?.with(comments)?)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_target(false)
        .compact()
        .init();

    let database_url =
        env::var("DATABASE_URL").unwrap_or_else(|_| "sqlite::memory:".to_string());
    let bind_addr = env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_string());

    let db: DatabaseConnection = Database::connect(&database_url).await?;
    seed(&db).await?;

    let state = AppState::new(db, registry()?);

    let mut apidocs = ApiDoc::openapi();
    for path in ["/users", "/comments"] {
        apidocs
            .paths
            .add_path_operation(path, vec![HttpMethod::Get], index_operation(path));
    }

    let app = axum::Router::new()
        .nest("/users", router::<user::Entity>(state.clone()))
        .nest("/comments", router::<comment::Entity>(state))
        .merge(Scalar::with_url("/docs", apidocs))
        .layer(TraceLayer::new_for_http());

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!("API: http://{bind_addr}/users  Docs: http://{bind_addr}/docs");
    axum::serve(listener, app).await?;
    Ok(())
}

/// OpenAPI operation for an index route, documenting the shared query parameters.
fn index_operation(path: &str) -> Operation {
    OperationBuilder::new()
        .summary(Some(format!("List {}", path.trim_start_matches('/'))))
        .parameters(Some(IndexQuery::into_params(|| None)))
        .response("200", ResponseBuilder::new().description("Matching records").build())
        .response(
            "400",
            ResponseBuilder::new()
                .description("Invalid filter or sort parameter")
                .build(),
        )
        .build()
}
