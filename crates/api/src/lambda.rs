use lambda_http::http::header::CONTENT_TYPE;
use lambda_http::{Body, Error, Request, Response, service_fn};
use std::sync::Arc;

use crate::handler::StoryPipeline;

/// API Gateway proxy event in, proxy response out.
pub async fn handle_event(pipeline: &StoryPipeline, event: Request) -> Result<Response<Body>, Error> {
    let outcome = pipeline.handle(event.body()).await;

    let response = Response::builder()
        .status(outcome.status_code())
        .header(CONTENT_TYPE, "application/json; charset=utf-8")
        .body(Body::Text(outcome.to_json()))?;

    Ok(response)
}

pub async fn run(pipeline: Arc<StoryPipeline>) -> Result<(), Error> {
    lambda_http::run(service_fn(move |event: Request| {
        let pipeline = Arc::clone(&pipeline);
        async move { handle_event(&pipeline, event).await }
    }))
    .await
}
