use mercato::{AggregateRequest, Category, Mercato};
use mercato_demos::common::get_adapters;
use tracing_subscriber::fmt::format::FmtSpan;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Suggested: RUST_LOG=info,mercato=trace,mercato_middleware=debug
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false)
        .with_span_events(FmtSpan::ENTER | FmtSpan::EXIT)
        .try_init();

    let mercato = get_adapters()?
        .into_iter()
        .fold(Mercato::builder(), |b, a| b.with_adapter(a))
        .build()?;

    let _ = mercato
        .aggregate(AggregateRequest::new().category(Category::Crypto).page_size(3))
        .await?;
    let _ = mercato.verify(&[Category::Crypto], &[]).await?;
    let _ = mercato.health().await;

    Ok(())
}
