//! Collapse accepted offers to one entry per URL.

use std::collections::HashMap;

use crate::types::Offer;

/// Keep one offer per URL. The last emitted offer for a URL wins and takes
/// the position where that URL first appeared.
pub fn dedup_by_url(offers: Vec<Offer>) -> Vec<Offer> {
    let mut index: HashMap<String, usize> = HashMap::with_capacity(offers.len());
    let mut unique: Vec<Offer> = Vec::with_capacity(offers.len());

    for offer in offers {
        match index.get(&offer.url) {
            Some(&i) => unique[i] = offer,
            None => {
                index.insert(offer.url.clone(), unique.len());
                unique.push(offer);
            }
        }
    }

    unique
}

#[cfg(test)]
mod tests {
    use super::*;

    fn offer(url: &str, price: Option<f64>) -> Offer {
        Offer {
            store: "web".into(),
            title: format!("t {url}"),
            url: url.into(),
            price,
        }
    }

    #[test]
    fn test_later_offer_wins() {
        let out = dedup_by_url(vec![
            offer("https://a.pl/1", Some(100.0)),
            offer("https://b.pl/2", None),
            offer("https://a.pl/1", Some(90.0)),
        ]);
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].url, "https://a.pl/1");
        assert_eq!(out[0].price, Some(90.0));
        assert_eq!(out[1].url, "https://b.pl/2");
    }

    #[test]
    fn test_no_duplicates_unchanged() {
        let input = vec![offer("https://a.pl/1", Some(1.0)), offer("https://a.pl/2", Some(2.0))];
        assert_eq!(dedup_by_url(input.clone()), input);
    }
}
