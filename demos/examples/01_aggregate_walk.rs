use mercato::{AggregateRequest, Category, Mercato};
use mercato_demos::common::get_adapters;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1. Register every adapter; the first one wins duplicate symbols.
    let mercato = get_adapters()?
        .into_iter()
        .fold(Mercato::builder(), |b, a| b.with_adapter(a))
        .build()?;
    println!("providers: {:?}", mercato.providers());

    // 2. Walk the crypto listing two rows per unit at a time.
    let mut cursor: Option<String> = None;
    let mut page = 1;
    loop {
        let mut req = AggregateRequest::new()
            .category(Category::Crypto)
            .page_size(2);
        if let Some(c) = cursor.take() {
            req = req.cursor(c);
        }
        let resp = mercato.aggregate(req).await?;

        println!("page {page}:");
        for snap in &resp.data {
            println!("  {:<10} {:>12.2}  via {}", snap.symbol, snap.price, snap.provider);
        }
        for (provider, status) in &resp.meta.status {
            println!("  [{provider}] {:?} {}", status.status, status.message.as_deref().unwrap_or(""));
        }

        // 3. Follow the cursor until every unit is exhausted.
        match resp.meta.next_cursor {
            Some(next) => cursor = Some(next),
            None => break,
        }
        page += 1;
    }

    Ok(())
}
