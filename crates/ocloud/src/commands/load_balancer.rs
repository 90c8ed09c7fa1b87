use crate::context;
use crate::output;
use anyhow::Context;
use colored::Colorize;
use ocloud_cloud::CancellationToken;
use ocloud_config::Settings;

pub async fn list(
    settings: &Settings,
    cancel: &CancellationToken,
    limit: usize,
    page: i64,
    all: bool,
    json: bool,
) -> anyhow::Result<()> {
    let service = context::build_service(settings, false)?;
    if !json {
        eprintln!("{}", "Fetching load balancers...".blue());
    }

    let slice = service
        .fetch_paginated(cancel, limit, page, all)
        .await
        .context("Failed to list load balancers")?;

    if json {
        return output::print_json(&slice.items);
    }

    println!();
    if all {
        // 詳細表示は1件ずつブロックで出す
        for lb in &slice.items {
            output::print_details(lb);
        }
    } else {
        output::print_table(&slice.items);
        println!();
    }
    output::print_page_footer(&slice, page, limit);
    Ok(())
}

pub async fn get(
    settings: &Settings,
    cancel: &CancellationToken,
    ocid: &str,
    deep: bool,
    json: bool,
) -> anyhow::Result<()> {
    let service = context::build_service(settings, deep)?;
    let lb = service
        .get_enriched(cancel, ocid)
        .await
        .with_context(|| format!("Failed to get load balancer {}", ocid))?;

    if json {
        return output::print_json(&lb);
    }
    output::print_details(&lb);
    Ok(())
}

pub async fn search(
    settings: &Settings,
    cancel: &CancellationToken,
    pattern: &str,
    all: bool,
    json: bool,
) -> anyhow::Result<()> {
    let service = context::build_service(settings, false)?;
    if !json {
        eprintln!(
            "{}",
            format!("Searching load balancers for '{}'...", pattern).blue()
        );
    }

    let found = service
        .search(cancel, pattern)
        .await
        .context("Failed to search load balancers")?;

    if json {
        return output::print_json(&found);
    }

    println!();
    if all {
        for lb in &found {
            output::print_details(lb);
        }
    } else {
        output::print_table(&found);
    }
    println!("{}", format!("{} match(es)", found.len()).dimmed());
    Ok(())
}
