//! Compartment-scoped load balancer service: paging and search on top of the adapter

use crate::adapter::Adapter;
use crate::error::Result;
use crate::model::LoadBalancer;
use tokio_util::sync::CancellationToken;

/// One page of a client-side paginated listing
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PageSlice {
    pub items: Vec<LoadBalancer>,

    /// Number of load balancers across all pages
    pub total: usize,

    /// 1-based number of the following page, if any
    pub next_page: Option<usize>,
}

pub struct LoadBalancerService {
    adapter: Adapter,
    compartment_id: String,
}

impl LoadBalancerService {
    pub fn new(adapter: Adapter, compartment_id: impl Into<String>) -> Self {
        Self {
            adapter,
            compartment_id: compartment_id.into(),
        }
    }

    pub fn compartment_id(&self) -> &str {
        &self.compartment_id
    }

    pub async fn list(&self, cancel: &CancellationToken) -> Result<Vec<LoadBalancer>> {
        tracing::debug!(compartment_id = %self.compartment_id, "listing load balancers");
        self.adapter
            .list_load_balancers(cancel, &self.compartment_id)
            .await
    }

    pub async fn get(&self, cancel: &CancellationToken, id: &str) -> Result<LoadBalancer> {
        tracing::debug!(ocid = id, "getting load balancer");
        self.adapter.get_load_balancer(cancel, id).await
    }

    pub async fn get_enriched(&self, cancel: &CancellationToken, id: &str) -> Result<LoadBalancer> {
        tracing::debug!(ocid = id, "getting enriched load balancer");
        self.adapter.get_enriched_load_balancer(cancel, id).await
    }

    /// List everything, then cut out page `page` (1-based) of `limit` items.
    ///
    /// `show_all` selects the fully enriched listing. A `limit` of zero
    /// returns every item on one page.
    pub async fn fetch_paginated(
        &self,
        cancel: &CancellationToken,
        limit: usize,
        page: i64,
        show_all: bool,
    ) -> Result<PageSlice> {
        tracing::debug!(limit, page, show_all, "fetching paginated load balancers");
        let all = if show_all {
            self.adapter
                .list_enriched_load_balancers(cancel, &self.compartment_id)
                .await?
        } else {
            self.adapter
                .list_load_balancers(cancel, &self.compartment_id)
                .await?
        };
        Ok(paginate(all, limit, page))
    }

    /// Enriched listing ranked against `pattern`, best match first.
    ///
    /// A blank pattern matches nothing.
    pub async fn search(
        &self,
        cancel: &CancellationToken,
        pattern: &str,
    ) -> Result<Vec<LoadBalancer>> {
        if pattern.trim().is_empty() {
            return Ok(Vec::new());
        }
        let all = self
            .adapter
            .list_enriched_load_balancers(cancel, &self.compartment_id)
            .await?;
        let matched = rank_matches(all, pattern);
        tracing::info!(search = pattern, matched = matched.len(), "searched load balancers");
        Ok(matched)
    }
}

pub fn paginate(all: Vec<LoadBalancer>, limit: usize, page: i64) -> PageSlice {
    let total = all.len();
    if limit == 0 {
        return PageSlice {
            items: all,
            total,
            next_page: None,
        };
    }

    let page = usize::try_from(page.max(1)).unwrap_or(1);
    let start = (page - 1).saturating_mul(limit);
    if start >= total {
        return PageSlice {
            items: Vec::new(),
            total,
            next_page: None,
        };
    }
    let end = start.saturating_add(limit).min(total);
    PageSlice {
        items: all.into_iter().skip(start).take(end - start).collect(),
        total,
        next_page: (end < total).then_some(page + 1),
    }
}

const EXACT: f64 = 3.0;
const TOKEN: f64 = 1.5;
const PREFIX: f64 = 1.3;
const FUZZY: f64 = 1.2;
const SUBSTRING: f64 = 1.1;

/// Weight of hits on name, OCID and hostnames
const BOOST: f64 = 1.8;

#[derive(Debug, Clone, Copy)]
enum Pass {
    Exact,
    Substring,
    Fuzzy,
}

/// Lower-cased searchable values of a load balancer, flagged when boosted
fn search_fields(lb: &LoadBalancer) -> Vec<(String, bool)> {
    let single = [
        (&lb.name, true),
        (&lb.ocid, true),
        (&lb.lb_type, false),
        (&lb.state, false),
        (&lb.vcn_name, false),
        (&lb.shape, false),
    ];
    let multi = [
        (&lb.ip_addresses, false),
        (&lb.hostnames, true),
        (&lb.ssl_certificates, false),
        (&lb.subnets, false),
    ];
    let listed = multi
        .into_iter()
        .flat_map(|(values, boosted)| values.iter().map(move |v| (v.as_str(), boosted)));
    single
        .into_iter()
        .map(|(value, boosted)| (value.as_str(), boosted))
        .chain(listed)
        .map(|(value, boosted)| (value.trim().to_lowercase(), boosted))
        .filter(|(value, _)| !value.is_empty())
        .collect()
}

/// Identifiers, addresses and dotted names skip straight to literal matching
fn looks_specific(needle: &str) -> bool {
    needle.chars().count() >= 15 || needle.contains(['.', ':', '-', '_', '/', '[', ']', '@'])
}

fn max_edits(needle: &str) -> usize {
    match needle.chars().count() {
        0..=2 => 0,
        3..=5 => 1,
        _ => 2,
    }
}

fn tokens(text: &str) -> impl Iterator<Item = &str> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|token| !token.is_empty())
}

fn fuzzy_score(text: &str, needle: &str, edits: usize) -> f64 {
    if text == needle {
        return EXACT;
    }
    let mut best = if text.contains(needle) { SUBSTRING } else { 0.0 };
    for token in tokens(text) {
        let score = if token == needle {
            TOKEN
        } else if token.starts_with(needle) {
            PREFIX
        } else if edits > 0 && strsim::levenshtein(token, needle) <= edits {
            FUZZY
        } else {
            continue;
        };
        best = f64::max(best, score);
    }
    best
}

fn score(fields: &[(String, bool)], needle: &str, pass: Pass) -> f64 {
    let edits = max_edits(needle);
    fields
        .iter()
        .map(|(text, boosted)| {
            let base = match pass {
                Pass::Exact if text == needle => EXACT,
                Pass::Substring if text.contains(needle) => SUBSTRING,
                Pass::Fuzzy => fuzzy_score(text, needle, edits),
                _ => 0.0,
            };
            if *boosted { base * BOOST } else { base }
        })
        .sum()
}

/// Keep the load balancers matching `pattern`, most relevant first.
///
/// Specific-looking patterns try exact then substring matches and only fall
/// back to the fuzzy pass when neither hits. Equal scores keep input order.
fn rank_matches(all: Vec<LoadBalancer>, pattern: &str) -> Vec<LoadBalancer> {
    let needle = pattern.trim().to_lowercase();
    if needle.is_empty() {
        return Vec::new();
    }
    let passes: &[Pass] = if looks_specific(&needle) {
        &[Pass::Exact, Pass::Substring, Pass::Fuzzy]
    } else {
        &[Pass::Fuzzy]
    };

    let fields: Vec<_> = all.iter().map(search_fields).collect();
    for &pass in passes {
        let mut scored: Vec<(f64, usize)> = fields
            .iter()
            .enumerate()
            .map(|(index, fields)| (score(fields, &needle, pass), index))
            .filter(|(relevance, _)| *relevance > 0.0)
            .collect();
        if scored.is_empty() {
            continue;
        }
        tracing::debug!(?pass, hits = scored.len(), "search pass matched");
        scored.sort_by(|a, b| b.0.total_cmp(&a.0));

        let mut slots: Vec<Option<LoadBalancer>> = all.into_iter().map(Some).collect();
        return scored
            .into_iter()
            .filter_map(|(_, index)| slots[index].take())
            .collect();
    }
    Vec::new()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn named(n: usize) -> Vec<LoadBalancer> {
        (1..=n)
            .map(|i| LoadBalancer {
                name: format!("lb-{}", i),
                ..Default::default()
            })
            .collect()
    }

    #[test]
    fn test_paginate_middle_page() {
        let slice = paginate(named(5), 2, 2);
        assert_eq!(slice.total, 5);
        assert_eq!(
            slice.items.iter().map(|lb| lb.name.as_str()).collect::<Vec<_>>(),
            vec!["lb-3", "lb-4"]
        );
        assert_eq!(slice.next_page, Some(3));
    }

    #[test]
    fn test_paginate_last_and_out_of_range() {
        let last = paginate(named(5), 2, 3);
        assert_eq!(last.items.len(), 1);
        assert_eq!(last.next_page, None);

        let beyond = paginate(named(5), 2, 9);
        assert!(beyond.items.is_empty());
        assert_eq!(beyond.total, 5);
        assert_eq!(beyond.next_page, None);
    }

    #[test]
    fn test_paginate_non_positive_page_is_first() {
        let slice = paginate(named(3), 2, 0);
        assert_eq!(slice.items[0].name, "lb-1");
        assert_eq!(paginate(named(3), 2, -4).items[0].name, "lb-1");
    }

    #[test]
    fn test_paginate_zero_limit_returns_everything() {
        let slice = paginate(named(4), 0, 3);
        assert_eq!(slice.items.len(), 4);
        assert_eq!(slice.next_page, None);
    }

    fn lb(name: &str) -> LoadBalancer {
        LoadBalancer {
            name: name.to_string(),
            ..Default::default()
        }
    }

    fn ranked(all: Vec<LoadBalancer>, pattern: &str) -> Vec<String> {
        rank_matches(all, pattern)
            .into_iter()
            .map(|lb| lb.name)
            .collect()
    }

    #[test]
    fn test_search_matches_across_fields() {
        let edge = LoadBalancer {
            name: "Edge-Prod".to_string(),
            lb_type: "Public".to_string(),
            hostnames: vec!["www.Example.com".to_string()],
            subnets: vec!["public-a (10.0.1.0/24)".to_string()],
            ssl_certificates: vec!["cert-a (Expires: 2030-06-15)".to_string()],
            ..Default::default()
        };
        let hit = |pattern: &str| !rank_matches(vec![edge.clone()], pattern).is_empty();

        assert!(hit("edge"));
        assert!(hit("EXAMPLE.com"));
        assert!(hit("10.0.1.0"));
        assert!(hit("2030-06"));
        assert!(hit("public"));
        assert!(hit("exam"));
        assert!(!hit("staging"));
    }

    #[test]
    fn test_search_tolerates_typos() {
        let all = vec![lb("staging-edge"), lb("production-edge"), lb("internal-api")];

        assert_eq!(ranked(all.clone(), "prodction"), vec!["production-edge"]);
        assert_eq!(ranked(all.clone(), "interal"), vec!["internal-api"]);
        assert!(ranked(all, "zzz").is_empty());
    }

    #[test]
    fn test_search_ranks_boosted_fields_first() {
        let mut by_subnet = lb("web");
        by_subnet.subnets = vec!["api (10.0.2.0/24)".to_string()];
        let mut by_hostname = lb("frontend");
        by_hostname.hostnames = vec!["api.example.com".to_string()];
        let all = vec![by_subnet, lb("unrelated"), by_hostname, lb("api")];

        assert_eq!(ranked(all, "api"), vec!["api", "frontend", "web"]);
    }

    #[test]
    fn test_specific_pattern_prefers_exact_match() {
        let mut exact = lb("gw-b");
        exact.ip_addresses = vec!["10.0.0.1".to_string()];
        let mut wider = lb("gw-a");
        wider.ip_addresses = vec!["10.0.0.12".to_string()];

        assert_eq!(ranked(vec![wider.clone(), exact], "10.0.0.1"), vec!["gw-b"]);
        assert_eq!(ranked(vec![wider], "10.0.0.1"), vec!["gw-a"]);
    }

    #[test]
    fn test_blank_pattern_matches_nothing() {
        assert!(ranked(vec![lb("alpha"), lb("bravo")], "").is_empty());
        assert!(ranked(vec![lb("alpha")], "   ").is_empty());
    }
}
