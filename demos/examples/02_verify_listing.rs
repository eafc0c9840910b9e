use mercato::{Category, Mercato};
use mercato_demos::common::get_adapters;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mercato = get_adapters()?
        .into_iter()
        .fold(Mercato::builder(), |b, a| b.with_adapter(a))
        .build()?;

    // Walk every listing and compare with the source's own row count.
    let report = mercato.verify(&Category::ALL, &[]).await?;
    for r in &report.results {
        println!(
            "{:<12} {:<8} {:?}: scraped {} / expected {:?} in {} ms",
            r.provider,
            r.category.as_str(),
            r.status,
            r.scraped_count,
            r.expected_count,
            r.latency_ms
        );
        for s in &r.samples {
            println!(
                "    {:<10} listed {:?} snapshot {:?} valid={} consistent={}",
                s.symbol, s.listed_price, s.snapshot_price, s.valid, s.consistent
            );
        }
    }

    // Health reflects the most recent statuses for a couple of minutes.
    let health = mercato.health().await;
    println!("{}", serde_json::to_string_pretty(&health)?);

    Ok(())
}
