use colored::{ColoredString, Colorize};
use ocloud_cloud::{BackendStatus, LoadBalancer, PageSlice};
use serde::Serialize;

pub fn print_json<T: Serialize + ?Sized>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn colored_state(state: &str, width: usize) -> ColoredString {
    let padded = format!("{:<width$}", state, width = width);
    match state {
        "ACTIVE" => padded.green(),
        "FAILED" => padded.red(),
        _ => padded.yellow(),
    }
}

fn colored_health(status: &str) -> ColoredString {
    match BackendStatus::from_remote(status) {
        BackendStatus::Ok => status.green(),
        BackendStatus::Warning => status.yellow(),
        BackendStatus::Critical => status.red(),
        BackendStatus::Unknown => status.dimmed(),
    }
}

/// バックエンドセットごとのヘルスを1行にまとめる
pub fn health_summary(lb: &LoadBalancer) -> String {
    if lb.backend_health.is_empty() {
        return "-".to_string();
    }
    lb.backend_health
        .iter()
        .map(|(set, status)| format!("{}:{}", set, status))
        .collect::<Vec<_>>()
        .join(", ")
}

/// 詳細表示用の公開範囲
fn visibility(lb: &LoadBalancer) -> &str {
    if lb.is_private() {
        "Private (VCN only)"
    } else if lb.lb_type.is_empty() {
        "-"
    } else {
        &lb.lb_type
    }
}

fn or_dash(values: &[String]) -> String {
    if values.is_empty() {
        "-".to_string()
    } else {
        values.join(", ")
    }
}

pub fn print_table(lbs: &[LoadBalancer]) {
    if lbs.is_empty() {
        println!("{}", "No load balancers found".dimmed());
        return;
    }

    println!(
        "{}",
        format!(
            "{:<28} {:<10} {:<8} {:<16} {:<12} {:<30} {}",
            "NAME", "STATE", "TYPE", "IP", "SHAPE", "SUBNETS", "BACKEND HEALTH"
        )
        .bold()
    );
    println!("{}", "─".repeat(130).dimmed());

    for lb in lbs {
        let ip = lb.ip_addresses.first().map(String::as_str).unwrap_or("-");
        println!(
            "{} {} {:<8} {:<16} {:<12} {:<30} {}",
            format!("{:<28}", lb.name).cyan(),
            colored_state(&lb.state, 10),
            lb.lb_type,
            ip,
            lb.shape,
            or_dash(&lb.subnets),
            health_summary(lb)
        );
    }
}

pub fn print_details(lb: &LoadBalancer) {
    println!("{}", lb.name.bold().cyan());
    println!("  {:<18} {}", "OCID:", lb.ocid);
    println!("  {:<18} {}", "State:", colored_state(&lb.state, 0));
    println!("  {:<18} {}", "Type:", visibility(lb));
    println!("  {:<18} {}", "Shape:", lb.shape);
    println!("  {:<18} {}", "IP addresses:", or_dash(&lb.ip_addresses));
    if let Some(created) = lb.created {
        println!(
            "  {:<18} {}",
            "Created:",
            created.format("%Y-%m-%d %H:%M:%S UTC")
        );
    }
    let vcn = if lb.vcn_name.is_empty() {
        lb.vcn_id.as_str()
    } else {
        lb.vcn_name.as_str()
    };
    println!("  {:<18} {}", "VCN:", if vcn.is_empty() { "-" } else { vcn });
    println!("  {:<18} {}", "Subnets:", or_dash(&lb.subnets));
    println!("  {:<18} {}", "NSGs:", or_dash(&lb.nsgs));
    println!("  {:<18} {}", "Hostnames:", or_dash(&lb.hostnames));
    println!("  {:<18} {}", "Routing policies:", or_dash(&lb.routing_policies));
    println!(
        "  {:<18} {}",
        "SSL:",
        if lb.use_ssl { "enabled" } else { "disabled" }
    );
    println!("  {:<18} {}", "Certificates:", or_dash(&lb.ssl_certificates));

    if !lb.listeners.is_empty() {
        println!("  {}", "Listeners:".bold());
        for (name, summary) in &lb.listeners {
            println!("    • {:<16} {}", name, summary);
        }
    }

    if !lb.backend_sets.is_empty() {
        println!("  {}", "Backend sets:".bold());
        for (name, set) in &lb.backend_sets {
            let health = lb.health_of(name).unwrap_or("UNKNOWN");
            let checker = if set.health_checker.is_empty() {
                String::new()
            } else {
                format!(" check {}", set.health_checker)
            };
            println!(
                "    • {} [{}] {}{}",
                name,
                colored_health(health),
                set.policy.dimmed(),
                checker.dimmed()
            );
            for backend in &set.backends {
                println!(
                    "        {}:{} {}",
                    backend.name,
                    backend.port,
                    colored_health(backend.status.as_str())
                );
            }
        }
    }
    println!();
}

pub fn print_page_footer(slice: &PageSlice, page: i64, limit: usize) {
    if limit == 0 {
        println!("{}", format!("{} load balancer(s)", slice.total).dimmed());
        return;
    }
    let pages = slice.total.div_ceil(limit).max(1);
    let mut footer = format!(
        "Page {} of {} ({} load balancer(s))",
        page.max(1),
        pages,
        slice.total
    );
    if let Some(next) = slice.next_page {
        footer.push_str(&format!(" · next: --page {}", next));
    }
    println!("{}", footer.dimmed());
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn test_health_summary() {
        let mut lb = LoadBalancer::default();
        assert_eq!(health_summary(&lb), "-");

        lb.backend_health = BTreeMap::from([
            ("web".to_string(), "OK".to_string()),
            ("api".to_string(), "CRITICAL".to_string()),
        ]);
        assert_eq!(health_summary(&lb), "api:CRITICAL, web:OK");
    }

    #[test]
    fn test_visibility() {
        let mut lb = LoadBalancer::default();
        assert_eq!(visibility(&lb), "-");

        lb.lb_type = "Public".to_string();
        assert_eq!(visibility(&lb), "Public");

        lb.lb_type = "Private".to_string();
        assert_eq!(visibility(&lb), "Private (VCN only)");
    }

    #[test]
    fn test_or_dash() {
        assert_eq!(or_dash(&[]), "-");
        assert_eq!(or_dash(&["a".to_string(), "b".to_string()]), "a, b");
    }
}
