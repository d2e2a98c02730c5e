use fynd::{EngineConfig, Product, SearchEngine};

fn main() -> anyhow::Result<()> {
    println!("=== FYND Basic Usage Example ===\n");

    let catalog = vec![
        Product::new("Sony WH-1000XM4 Noise Cancelling Headphones")
            .with_brand("Sony")
            .with_categories(["Electronics", "Audio", "Headphones"])
            .with_description("Wireless over-ear headphones with industry leading noise cancelling")
            .with_price(19990.0)
            .with_retail_price(29990.0)
            .with_rating(4.7),
        Product::new("boAt Rockerz 450 Wireless Headphones")
            .with_brand("boAt")
            .with_categories(["Electronics", "Audio", "Headphones"])
            .with_description("On-ear bluetooth headphones with 15 hours playback")
            .with_price(1499.0)
            .with_retail_price(3990.0)
            .with_rating(4.1),
        Product::new("JBL C100SI Wired Earphones")
            .with_brand("JBL")
            .with_categories(["Electronics", "Audio", "Earphones"])
            .with_description("In-ear wired earphones with mic")
            .with_price(599.0),
        Product::new("Lace Bralette")
            .with_brand("Zivame")
            .with_categories(["Clothing", "Lingerie"])
            .with_price(499.0),
    ];

    let engine = SearchEngine::build(catalog, EngineConfig::default())?;
    println!("✓ Indexed {} products\n", engine.products().len());

    for query in [
        "wireless headphones under 2000",
        "\"noise cancelling\" -wired",
        "jbl earphones",
        "bralette",
    ] {
        println!("--- {} ---", query);
        let outcome = engine.execute(query, 5);
        println!("Clean query: {:?}", outcome.clean_query);
        println!("Filters: {:?}", outcome.filters);

        if outcome.results.is_empty() {
            println!("No results");
        }
        for result in &outcome.results {
            if let Some(product) = engine.product(result.doc_id) {
                println!("  {:.3}  {}", result.score, product.name);
            }
        }
        println!();
    }

    let stats = engine.stats();
    println!("Index: {} terms over {} products", stats.index.total_terms, stats.total_products);

    Ok(())
}
