//! Next-departure selection
//!
//! The API filters by route (unreliably) but has no direction parameter, so
//! direction filtering happens here. Departures are taken in server order,
//! which is sorted by expected arrival; the selector never re-sorts.

use integration_cumtd::Departure;

/// Pick the departure to report for a target
///
/// With a direction filter, only departures whose direction is present and
/// equal to the filter ignoring case are eligible; departures without a
/// direction never match. The first eligible departure wins. An empty filter
/// is treated as no filter.
pub fn select_next_departure<'a>(
    departures: &'a [Departure],
    direction_filter: Option<&str>,
) -> Option<&'a Departure> {
    let Some(filter) = direction_filter.filter(|f| !f.is_empty()) else {
        return departures.first();
    };

    let wanted = filter.to_lowercase();
    departures.iter().find(|departure| {
        departure
            .direction()
            .is_some_and(|direction| direction.to_lowercase() == wanted)
    })
}
