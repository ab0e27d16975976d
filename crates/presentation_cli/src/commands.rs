//! One-shot API commands

use anyhow::{Context, bail};
use application::select_next_departure;
use integration_cumtd::{CumtdClient, Departure, Route, Stop};

/// Check the configured key
pub async fn validate_key(client: &dyn CumtdClient) -> anyhow::Result<()> {
    match client.validate_credential().await {
        Ok(true) => {
            println!("✅ API key is valid");
            Ok(())
        },
        Ok(false) => bail!("API key was rejected"),
        Err(e) if e.is_authentication() => bail!("API key was rejected: {e}"),
        Err(e) => Err(e).context("Cannot reach the MTD API"),
    }
}

pub async fn search_stops(client: &dyn CumtdClient, query: &str) -> anyhow::Result<()> {
    let response = client
        .get_stops_by_search(query)
        .await
        .context("Stop search failed")?;

    if response.stops.is_empty() {
        println!("🔍 No stops matching \"{query}\"");
        return Ok(());
    }

    println!("🚏 Stops matching \"{query}\":");
    for line in stop_lines(&response.stops) {
        println!("{line}");
    }
    Ok(())
}

pub async fn routes(client: &dyn CumtdClient, stop_id: &str) -> anyhow::Result<()> {
    let response = client
        .get_routes_by_stop(stop_id)
        .await
        .with_context(|| format!("Fetching routes for {stop_id} failed"))?;

    if response.routes.is_empty() {
        println!("🔍 No routes serve {stop_id}");
        return Ok(());
    }

    println!("🚌 Routes serving {stop_id}:");
    for line in route_lines(&response.routes) {
        println!("{line}");
    }
    Ok(())
}

pub async fn departures(
    client: &dyn CumtdClient,
    stop_id: &str,
    route: Option<&str>,
    count: u32,
    direction: Option<&str>,
) -> anyhow::Result<()> {
    let response = client
        .get_departures_by_stop(stop_id, route, Some(count))
        .await
        .with_context(|| format!("Fetching departures for {stop_id} failed"))?;

    println!("🕐 Departures from {stop_id} at {}:", response.time.format("%H:%M"));
    if response.departures.is_empty() {
        println!("   (none)");
    }
    for departure in &response.departures {
        println!("   {departure}");
    }

    println!();
    println!("{}", selection_line(&response.departures, direction));
    Ok(())
}

fn stop_lines(stops: &[Stop]) -> Vec<String> {
    stops.iter().map(|stop| format!("   {stop}")).collect()
}

fn route_lines(routes: &[Route]) -> Vec<String> {
    routes
        .iter()
        .map(|route| match &route.route_long_name {
            Some(long_name) => format!("   {} {long_name} [{}]", route.display_name(), route.route_id),
            None => format!("   {} [{}]", route.display_name(), route.route_id),
        })
        .collect()
}

fn selection_line(departures: &[Departure], direction: Option<&str>) -> String {
    let filter = direction.filter(|d| !d.is_empty());
    match (select_next_departure(departures, filter), filter) {
        (Some(next), _) => format!("➡️  Next bus: {next}"),
        (None, Some(direction)) => format!("➡️  No upcoming {direction} departures"),
        (None, None) => "➡️  No upcoming departures".to_string(),
    }
}
