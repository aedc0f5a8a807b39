//! Per-store result reporting: preview, statistics, cheapest offers and
//! the deal notification.

use pricewatch::Offer;

/// Offers shown in the preview.
pub const PREVIEW_LEN: usize = 5;

/// Cheapest offers listed after every search.
pub const TOP_LEN: usize = 3;

/// Priced view over one search's offers.
#[derive(Debug)]
pub struct OfferSummary<'a> {
    pub total: usize,
    /// Priced offers, cheapest first.
    pub priced: Vec<(&'a Offer, f64)>,
    pub max_price: f64,
}

impl<'a> OfferSummary<'a> {
    pub fn new(offers: &'a [Offer], max_price: f64) -> Self {
        let mut priced: Vec<(&Offer, f64)> = offers
            .iter()
            .filter_map(|o| o.price.map(|p| (o, p)))
            .collect();
        priced.sort_by(|a, b| a.1.total_cmp(&b.1));
        Self {
            total: offers.len(),
            priced,
            max_price,
        }
    }

    /// Priced offers at or under the product's limit, cheapest first.
    pub fn deals(&self) -> impl Iterator<Item = &(&'a Offer, f64)> {
        self.priced.iter().filter(|(_, p)| *p <= self.max_price)
    }

    pub fn deal_count(&self) -> usize {
        self.deals().count()
    }

    pub fn cheapest(&self, n: usize) -> &[(&'a Offer, f64)] {
        &self.priced[..n.min(self.priced.len())]
    }

    pub fn log(&self, product: &str, store: &str, offers: &[Offer]) {
        if offers.is_empty() {
            tracing::info!("No results from {store} for {product:?}");
        } else {
            tracing::info!("Preview of first results ({}):", offers.len().min(PREVIEW_LEN));
            for (i, o) in offers.iter().take(PREVIEW_LEN).enumerate() {
                let price = o
                    .price
                    .map(|p| format!("{p:.2}"))
                    .unwrap_or_else(|| "none".to_string());
                tracing::info!("  [{}] {} | price={} | {}", i + 1, o.title, price, o.url);
            }
        }

        tracing::info!(
            "Stats: {} result(s), {} priced, {} <= {:.2} PLN",
            self.total,
            self.priced.len(),
            self.deal_count(),
            self.max_price
        );

        if !self.priced.is_empty() {
            tracing::info!("Cheapest priced offers:");
            for (i, (o, p)) in self.cheapest(TOP_LEN).iter().enumerate() {
                tracing::info!("  #{}  {p:.2} PLN | {} | {}", i + 1, o.title, o.url);
            }
        }
    }

    /// Deal message for the product, if any offer is within the limit.
    pub fn notification(&self, product: &str) -> Option<String> {
        let lines: Vec<String> = self
            .deals()
            .map(|(o, p)| format!("{}: {} | {p:.2} PLN\n{}", o.store, o.title, o.url))
            .collect();
        if lines.is_empty() {
            return None;
        }
        Some(format!(
            "Found offers <= {:.2} PLN for {product}\n\n{}",
            self.max_price,
            lines.join("\n\n")
        ))
    }
}
