use axum::{
    middleware,
    routing::{get, post},
    Router,
};

use crate::{authorize::authorization_layer, ShortenerCtx};

use super::{link_api, user_api};

pub fn router(ctx: ShortenerCtx) -> Router {
    let protected = Router::new()
        .route("/l", post(link_api::create_link).get(link_api::list_links))
        .route("/l/{id}", get(link_api::follow_link))
        .route("/users/me", get(user_api::profile))
        .route_layer(middleware::from_fn_with_state(
            ctx.clone(),
            authorization_layer,
        ));

    Router::new()
        .route("/users", post(user_api::signup))
        .route("/users/token", post(user_api::login))
        .merge(protected)
        .with_state(ctx)
}
