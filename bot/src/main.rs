// SPDX-FileCopyrightText: 2024 Softbear, Inc.
// SPDX-License-Identifier: AGPL-3.0-or-later

use common::protocol::{self, Inbound, TurnSubmission};
use deliberate::Deliberator;
use log::{error, info, warn};
use std::io::{self, BufRead};

mod attack;
mod deliberate;
mod opening;
mod queue;

fn main() {
    // Engine commands own stdout; everything human-facing goes to
    // stderr through env_logger.
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp(None)
        .init();

    let stdin = io::stdin();
    let mut stdout = io::stdout();
    let mut lines = stdin.lock().lines();

    let Some(Ok(config_line)) = lines.next() else {
        error!("engine closed the channel before sending config");
        return;
    };
    let catalog = match protocol::parse_config(&config_line) {
        Ok(config) => match protocol::catalog_from_config(&config) {
            Ok(catalog) => catalog,
            Err(e) => {
                error!("unusable config: {e}");
                return;
            }
        },
        Err(e) => {
            error!("malformed config: {e}");
            return;
        }
    };

    let mut bot = Deliberator::new(rand::random());

    for line in lines {
        let Ok(line) = line else {
            break;
        };
        if line.trim().is_empty() {
            continue;
        }
        match protocol::parse_state(&line) {
            Ok(Inbound::Turn(doc)) => {
                let submission = match protocol::game_state_from_turn(&doc, &catalog) {
                    Ok(state) => bot.take_turn(&state, &catalog),
                    Err(e) => {
                        warn!("unusable turn state, submitting an empty turn: {e}");
                        TurnSubmission::default()
                    }
                };
                if let Err(e) = submission.submit(&mut stdout, &catalog) {
                    error!("submit failed: {e}");
                    break;
                }
            }
            Ok(Inbound::Frame(doc)) => {
                for (cell, scored_on_us) in protocol::breaches(&doc) {
                    if scored_on_us {
                        bot.on_breach(cell);
                    }
                }
            }
            Ok(Inbound::End(_)) => {
                info!("game over");
                break;
            }
            Err(e) => warn!("dropping malformed line: {e}"),
        }
    }
}
