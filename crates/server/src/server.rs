use axum::{
    Router,
    extract::{Request, State},
    http::StatusCode,
    middleware::{self, Next},
    response::Response,
    routing::{get, post},
};
use axum_extra::{
    TypedHeader,
    headers::{Authorization, authorization::Basic},
};
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter};

use std::{net::SocketAddr, sync::Arc};

use crate::{summary, themes, transactions, user, wallets};
use engine::{AuthContext, Engine, SqlStore};

/// The engine the HTTP layer runs against.
pub type AppEngine = Engine<SqlStore>;

#[derive(Clone)]
pub struct ServerState {
    pub engine: Arc<AppEngine>,
    pub db: DatabaseConnection,
}

/// Checks Basic credentials against `users` and hands the handlers an
/// [`AuthContext`] for the matching user.
async fn auth(
    auth_header: TypedHeader<Authorization<Basic>>,
    State(state): State<ServerState>,
    mut request: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    if auth_header.username().is_empty() || auth_header.password().is_empty() {
        return Err(StatusCode::UNAUTHORIZED);
    }

    let user: Option<user::Model> = user::Entity::find()
        .filter(user::Column::Username.eq(auth_header.username()))
        .filter(user::Column::Password.eq(auth_header.password()))
        .one(&state.db)
        .await
        .map_err(|err| {
            tracing::error!("failed to look up user: {err}");
            StatusCode::UNAUTHORIZED
        })?;

    let Some(user) = user else {
        tracing::debug!(username = auth_header.username(), "rejected credentials");
        return Err(StatusCode::UNAUTHORIZED);
    };

    request
        .extensions_mut()
        .insert(AuthContext::new(user.username));
    Ok(next.run(request).await)
}

pub fn router(state: ServerState) -> Router {
    Router::new()
        .route("/wallets", get(wallets::list).post(wallets::wallet_new))
        .route(
            "/wallets/{id}",
            get(wallets::get)
                .patch(wallets::wallet_update)
                .delete(wallets::wallet_delete),
        )
        .route(
            "/wallets/{id}/themes",
            get(themes::list).post(themes::theme_new),
        )
        .route(
            "/themes/{id}",
            get(themes::get)
                .patch(themes::theme_update)
                .delete(themes::theme_delete),
        )
        .route("/themes/{id}/recalculate", post(themes::recalculate))
        .route(
            "/transactions",
            get(transactions::list).post(transactions::create),
        )
        .route(
            "/transactions/{id}",
            get(transactions::get)
                .patch(transactions::update)
                .delete(transactions::delete),
        )
        .route("/summary", get(summary::get))
        .route_layer(middleware::from_fn_with_state(state.clone(), auth))
        .with_state(state)
}

pub async fn run(engine: AppEngine, db: DatabaseConnection, addr: SocketAddr) {
    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(err) => {
            tracing::error!("failed to bind server listener on {addr}: {err}");
            return;
        }
    };
    if let Err(err) = run_with_listener(engine, db, listener).await {
        tracing::error!("server failed: {err}");
    }
}

pub async fn run_with_listener(
    engine: AppEngine,
    db: DatabaseConnection,
    listener: tokio::net::TcpListener,
) -> Result<(), std::io::Error> {
    let addr = listener.local_addr()?;
    tracing::info!("Server listening on {}", addr);

    let state = ServerState {
        engine: Arc::new(engine),
        db,
    };

    axum::serve(listener, router(state)).await
}

pub fn spawn_with_listener(
    engine: AppEngine,
    db: DatabaseConnection,
    listener: tokio::net::TcpListener,
) -> Result<SocketAddr, std::io::Error> {
    let addr = listener.local_addr()?;

    tokio::spawn(async move {
        if let Err(err) = run_with_listener(engine, db, listener).await {
            tracing::error!("server failed: {err}");
        }
    });

    Ok(addr)
}
