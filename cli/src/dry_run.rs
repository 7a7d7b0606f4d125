//! `--dry-run`: shows the request each lookup would send, without sending it.
//!
//! Events go through the same session context and trigger gate the live
//! path uses, so paused observations and repeats produce nothing here too.

use dispatcher::names::name_candidates;
use market::query::{MarketRequest, QueryBuilder};
use market::types::{FilterConfig, PriceQuery};
use serde::Serialize;
use serde_json::{Value, json};
use session::gate::maybe_trigger;
use session::model::SessionContext;
use tracing::warn;

use crate::events::ReplayEvent;

#[derive(Debug, Serialize)]
pub struct PlannedRequest {
    pub backend: &'static str,
    pub system: String,
    pub commodity: String,
    pub attempt: usize,
    pub request: Value,
}

pub fn plan_requests(
    events: &[ReplayEvent],
    builder: &dyn QueryBuilder,
    filter: &FilterConfig,
) -> Vec<PlannedRequest> {
    let now = common::time::now_utc();
    let mut ctx = SessionContext::new();
    let mut planned = Vec::new();

    for event in events {
        match event {
            ReplayEvent::Begin { system } => {
                if let Err(err) = ctx.begin(system) {
                    warn!(error = %err, "begin ignored");
                }
            }
            ReplayEvent::Pause => {
                let _ = ctx.pause();
            }
            ReplayEvent::Resume => {
                let _ = ctx.resume();
            }
            ReplayEvent::End => {
                ctx.end();
            }
            ReplayEvent::Wait { .. } => {}
            ReplayEvent::Delta {
                name,
                canonical,
                tons,
            } => {
                let Some(applied) = ctx
                    .ledger_mut()
                    .and_then(|l| l.apply_delta(name, canonical, *tons))
                else {
                    continue;
                };
                let Some(job) = maybe_trigger(&mut ctx, &applied, filter) else {
                    continue;
                };

                for (i, commodity) in name_candidates(&job).into_iter().enumerate() {
                    let query = PriceQuery {
                        commodity,
                        reference_system: job.reference_system.clone(),
                        filter: job.filter.clone(),
                    };
                    planned.push(PlannedRequest {
                        backend: builder.backend(),
                        system: query.reference_system.clone(),
                        commodity: query.commodity.clone(),
                        attempt: i + 1,
                        request: render(&builder.build(&query, now)),
                    });
                }
            }
        }
    }

    planned
}

fn render(request: &MarketRequest) -> Value {
    match request {
        MarketRequest::Body(body) => body.clone(),
        MarketRequest::Params(pairs) => json!({ "params": pairs }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use market::query::{PositionalQueryBuilder, RangeQueryBuilder};

    use crate::events::parse_events;

    const RUN: &str = r#"
{"event":"begin","system":"Borann"}
{"event":"delta","name":"Low Temperature Diamonds","canonical":"lowtemperaturediamond","tons":1}
{"event":"delta","name":"Low Temperature Diamonds","canonical":"lowtemperaturediamond","tons":1}
{"event":"pause"}
{"event":"delta","name":"Painite","canonical":"painite","tons":1}
{"event":"resume"}
{"event":"delta","name":"Platinum","canonical":"platinum","tons":1}
"#;

    #[test]
    fn plans_one_request_per_name_attempt() {
        let events = parse_events(RUN).unwrap();
        let plan = plan_requests(&events, &RangeQueryBuilder, &FilterConfig::default());

        let names: Vec<_> = plan.iter().map(|p| (p.commodity.as_str(), p.attempt)).collect();
        assert_eq!(
            names,
            [
                ("Low Temperature Diamonds", 1),
                ("lowtemperaturediamond", 2),
                ("Platinum", 1),
            ]
        );
        assert!(plan.iter().all(|p| p.system == "Borann" && p.backend == "range"));
        assert_eq!(plan[2].request["reference_system"], "Borann");
    }

    #[test]
    fn positional_requests_render_as_params() {
        let events = parse_events(RUN).unwrap();
        let plan = plan_requests(&events, &PositionalQueryBuilder::default(), &FilterConfig::default());

        let params = plan[0].request["params"].as_array().unwrap();
        assert!(params.iter().any(|p| p[0] == "ps1" && p[1] == "Borann"));
    }
}
