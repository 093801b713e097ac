// SPDX-FileCopyrightText: 2024 Softbear, Inc.
// SPDX-License-Identifier: AGPL-3.0-or-later

//! The engine link: JSON documents on stdin, JSON command lines on
//! stdout. All coordinates on the wire are absolute board coordinates;
//! [`Cell::reflect`] maps a cell into the opponent's frame of
//! reference when placements need mirroring.

use crate::arena::Cell;
use crate::map::GameMap;
use crate::state::{GameState, Player, Resources};
use crate::unit::{Catalog, KindArray, Side, Unit, UnitKind, UnitStats};
use serde::Deserialize;
use serde_json::Value;
use std::io::{self, Write};

/// Wire spawn codes, `unitInformation` order: 0..=5 are the unit kinds,
/// 6 removal, 7 upgrade.
pub const REMOVE_CODE: usize = 6;
pub const UPGRADE_CODE: usize = 7;

#[derive(Debug, Deserialize)]
pub struct Config {
    #[serde(rename = "unitInformation")]
    pub unit_information: Vec<UnitInfo>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct UnitInfo {
    pub shorthand: String,
    pub cost1: Option<f32>,
    pub cost2: Option<f32>,
    pub start_health: Option<f32>,
    pub attack_range: Option<f32>,
    pub shield_range: Option<f32>,
    pub shield_per_unit: Option<f32>,
    pub attack_damage_walker: Option<f32>,
    pub attack_damage_tower: Option<f32>,
    pub speed: Option<f32>,
    pub upgrade: Option<Box<UnitInfo>>,
}

impl UnitInfo {
    fn stats(&self) -> UnitStats {
        let speed = self.speed.unwrap_or(0.0);
        UnitStats {
            cost: self.cost1.unwrap_or(0.0),
            upgrade_cost: self.cost2.unwrap_or(0.0),
            health: self.start_health.unwrap_or(0.0),
            attack_range: self.attack_range.unwrap_or(0.0),
            shield_range: self.shield_range.unwrap_or(0.0),
            shield_per_unit: self.shield_per_unit.unwrap_or(0.0),
            damage_mobile: self.attack_damage_walker.unwrap_or(0.0),
            damage_structure: self.attack_damage_tower.unwrap_or(0.0),
            frames_per_step: if speed > 0.0 {
                (1.0 / speed).round() as u32
            } else {
                0
            },
        }
    }

    /// Upgraded stats: the `upgrade` patch overrides, everything else
    /// carries over from the base.
    fn upgraded_stats(&self) -> UnitStats {
        let base = self.stats();
        let Some(up) = &self.upgrade else {
            return base;
        };
        let speed = up.speed.unwrap_or(0.0);
        UnitStats {
            cost: up.cost1.unwrap_or(base.cost),
            upgrade_cost: up.cost2.unwrap_or(base.upgrade_cost),
            health: up.start_health.unwrap_or(base.health),
            attack_range: up.attack_range.unwrap_or(base.attack_range),
            shield_range: up.shield_range.unwrap_or(base.shield_range),
            shield_per_unit: up.shield_per_unit.unwrap_or(base.shield_per_unit),
            damage_mobile: up.attack_damage_walker.unwrap_or(base.damage_mobile),
            damage_structure: up.attack_damage_tower.unwrap_or(base.damage_structure),
            frames_per_step: if speed > 0.0 {
                (1.0 / speed).round() as u32
            } else {
                base.frames_per_step
            },
        }
    }
}

pub fn parse_config(line: &str) -> Result<Config, serde_json::Error> {
    serde_json::from_str(line)
}

pub fn catalog_from_config(config: &Config) -> Result<Catalog, &'static str> {
    if config.unit_information.len() < 6 {
        return Err("config lists fewer than six unit kinds");
    }
    let info = |kind: UnitKind| &config.unit_information[kind as u8 as usize];
    Ok(Catalog {
        base: KindArray::from_fn(|k| info(k).stats()),
        upgraded: KindArray::from_fn(|k| info(k).upgraded_stats()),
        shorthands: KindArray::from_fn(|k| info(k).shorthand.clone()),
        remove_shorthand: config
            .unit_information
            .get(REMOVE_CODE)
            .map(|i| i.shorthand.clone())
            .unwrap_or_else(|| "RM".to_owned()),
        upgrade_shorthand: config
            .unit_information
            .get(UPGRADE_CODE)
            .map(|i| i.shorthand.clone())
            .unwrap_or_else(|| "UP".to_owned()),
    })
}

/// Raw inbound state, shared by turn and action-frame documents.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StateDocument {
    pub turn_info: Vec<f64>,
    #[serde(default)]
    pub p1_units: Vec<Vec<Vec<Value>>>,
    #[serde(default)]
    pub p2_units: Vec<Vec<Vec<Value>>>,
    #[serde(default)]
    pub p1_stats: Vec<f64>,
    #[serde(default)]
    pub p2_stats: Vec<f64>,
    #[serde(default)]
    pub events: Option<Events>,
}

#[derive(Debug, Default, Deserialize)]
pub struct Events {
    #[serde(default)]
    pub breach: Vec<Vec<Value>>,
    #[serde(default)]
    pub spawn: Vec<Vec<Value>>,
}

#[derive(Debug)]
pub enum Inbound {
    Turn(StateDocument),
    Frame(StateDocument),
    End(StateDocument),
}

pub fn parse_state(line: &str) -> Result<Inbound, &'static str> {
    let doc: StateDocument =
        serde_json::from_str(line).map_err(|_| "malformed state document")?;
    match doc.turn_info.first().map(|&t| t as i64) {
        Some(0) => Ok(Inbound::Turn(doc)),
        Some(1) => Ok(Inbound::Frame(doc)),
        Some(2) => Ok(Inbound::End(doc)),
        _ => Err("unexpected turnInfo type"),
    }
}

fn row_cell(row: &[Value]) -> Option<Cell> {
    let x = row.first()?.as_f64()?;
    let y = row.get(1)?.as_f64()?;
    if !(0.0..=255.0).contains(&x) || !(0.0..=255.0).contains(&y) {
        return None;
    }
    Some(Cell::new(x as u8, y as u8))
}

fn row_health(row: &[Value]) -> Option<f32> {
    row.get(2)?.as_f64().map(|h| h as f32)
}

fn player_from_stats(stats: &[f64]) -> Player {
    Player {
        health: stats.first().copied().unwrap_or(0.0) as f32,
        resources: Resources {
            sp: stats.get(1).copied().unwrap_or(0.0) as f32,
            mp: stats.get(2).copied().unwrap_or(0.0) as f32,
        },
    }
}

/// Reconstructs the full board from a turn document. Both players'
/// units arrive in absolute coordinates; list 7 marks upgrades.
pub fn game_state_from_turn(
    doc: &StateDocument,
    catalog: &Catalog,
) -> Result<GameState, &'static str> {
    let turn = *doc.turn_info.get(1).ok_or("missing turn number")? as u32;

    let mut map = GameMap::new();
    for (side, lists) in [(Side::Bottom, &doc.p1_units), (Side::Top, &doc.p2_units)] {
        for kind in UnitKind::iter() {
            let Some(rows) = lists.get(kind as u8 as usize) else {
                continue;
            };
            for row in rows {
                let cell = row_cell(row).ok_or("bad unit location")?;
                let health = row_health(row).ok_or("bad unit health")?;
                let mut unit = if kind.is_structure() {
                    Unit::structure(kind, side, cell, catalog)
                } else {
                    Unit::mobile(kind, side, cell, catalog)
                };
                unit.health = health;
                map.add_existing_unit(unit);
            }
        }
        if let Some(upgrades) = lists.get(UPGRADE_CODE) {
            for row in upgrades {
                let cell = row_cell(row).ok_or("bad upgrade location")?;
                // The unit's own row already reported post-upgrade health.
                if let Some((id, unit)) = map.structure_at(cell) {
                    let reported = unit.health;
                    map.unit_mut(id).upgrade(catalog);
                    map.unit_mut(id).health = reported;
                }
            }
        }
    }

    let mut state = GameState {
        turn,
        map,
        ..GameState::new(turn)
    };
    state.players[Side::Bottom] = player_from_stats(&doc.p1_stats);
    state.players[Side::Top] = player_from_stats(&doc.p2_stats);
    Ok(state)
}

/// Breach events as `(cell, we_were_scored_on)`. Wire owner 1 is self,
/// 2 is opponent; an opponent-owned breach landed on us.
pub fn breaches(doc: &StateDocument) -> Vec<(Cell, bool)> {
    let Some(events) = &doc.events else {
        return Vec::new();
    };
    events
        .breach
        .iter()
        .filter_map(|row| {
            let loc = row.first()?.as_array()?;
            let cell = row_cell(&[loc.first()?.clone(), loc.get(1)?.clone()])?;
            let owner = row.get(4)?.as_f64()? as i64;
            Some((cell, owner == 2))
        })
        .collect()
}

/// One outbound placement.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Command {
    Spawn { kind: UnitKind, cell: Cell },
    Upgrade { cell: Cell },
    Remove { cell: Cell },
}

/// A turn's worth of commands: the structure line (builds, upgrades,
/// removals) then the deployment line. Writing the deployment line is
/// the submit that ends the turn.
#[derive(Clone, Debug, Default)]
pub struct TurnSubmission {
    builds: Vec<Command>,
    deploys: Vec<Command>,
}

impl TurnSubmission {
    pub fn push(&mut self, command: Command) {
        match command {
            Command::Spawn { kind, .. } if kind.is_mobile() => self.deploys.push(command),
            _ => self.builds.push(command),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.builds.is_empty() && self.deploys.is_empty()
    }

    pub fn build_count(&self) -> usize {
        self.builds.len()
    }

    pub fn deploy_count(&self) -> usize {
        self.deploys.len()
    }

    fn line(commands: &[Command], catalog: &Catalog) -> String {
        let entries: Vec<(&str, u8, u8)> = commands
            .iter()
            .map(|&command| match command {
                Command::Spawn { kind, cell } => {
                    (catalog.shorthands[kind].as_str(), cell.x, cell.y)
                }
                Command::Upgrade { cell } => {
                    (catalog.upgrade_shorthand.as_str(), cell.x, cell.y)
                }
                Command::Remove { cell } => {
                    (catalog.remove_shorthand.as_str(), cell.x, cell.y)
                }
            })
            .collect();
        serde_json::to_string(&entries).expect("command serialization is infallible")
    }

    /// Writes both command lines and flushes; the engine treats the
    /// deployment line as end of turn.
    pub fn submit(&self, out: &mut impl Write, catalog: &Catalog) -> io::Result<()> {
        writeln!(out, "{}", Self::line(&self.builds, catalog))?;
        writeln!(out, "{}", Self::line(&self.deploys, catalog))?;
        out.flush()
    }
}

#[cfg(test)]
mod tests {
    use crate::arena::Cell;
    use crate::protocol::{
        breaches, catalog_from_config, game_state_from_turn, parse_config, parse_state, Command,
        Inbound, TurnSubmission,
    };
    use crate::unit::{Catalog, Side, UnitKind};

    fn config_line() -> String {
        // Six kinds plus removal and upgrade, engine field names.
        r#"{"unitInformation":[
            {"shorthand":"FF","cost1":1.0,"cost2":1.5,"startHealth":60.0,"upgrade":{"startHealth":120.0}},
            {"shorthand":"EF","cost1":4.0,"cost2":4.0,"startHealth":30.0,"shieldRange":3.5,"shieldPerUnit":3.0,"upgrade":{"shieldRange":7.0,"shieldPerUnit":4.0}},
            {"shorthand":"DF","cost1":2.0,"cost2":4.0,"startHealth":75.0,"attackRange":2.5,"attackDamageWalker":5.0,"upgrade":{"attackRange":3.5,"attackDamageWalker":15.0}},
            {"shorthand":"PI","cost1":1.0,"startHealth":15.0,"attackRange":3.5,"attackDamageWalker":2.0,"attackDamageTower":2.0,"speed":1.0},
            {"shorthand":"EI","cost1":3.0,"startHealth":5.0,"attackRange":4.5,"attackDamageWalker":8.0,"attackDamageTower":8.0,"speed":0.5},
            {"shorthand":"SI","cost1":1.0,"startHealth":40.0,"attackRange":4.5,"attackDamageWalker":20.0,"speed":0.25},
            {"shorthand":"RM"},
            {"shorthand":"UP"}
        ]}"#
        .replace('\n', "")
    }

    fn wire_catalog() -> Catalog {
        catalog_from_config(&parse_config(&config_line()).unwrap()).unwrap()
    }

    #[test]
    fn config_round_trips_the_catalog() {
        let catalog = wire_catalog();
        let standard = Catalog::standard();
        for kind in UnitKind::iter() {
            assert_eq!(catalog.stats(kind, false), standard.stats(kind, false));
            assert_eq!(catalog.stats(kind, true), standard.stats(kind, true));
            assert_eq!(catalog.shorthands[kind], standard.shorthands[kind]);
        }
        assert_eq!(catalog.remove_shorthand, "RM");
        assert_eq!(catalog.upgrade_shorthand, "UP");
    }

    #[test]
    fn turn_document_rebuilds_the_board() {
        let catalog = wire_catalog();
        let line = r#"{
            "turnInfo":[0,7,-1],
            "p1Stats":[27.0,12.5,8.2,70],
            "p2Stats":[30.0,4.0,11.0,70],
            "p1Units":[[[3,12,75.0,"1"]],[],[[7,8,40.0,"2"]],[],[],[],[],[[3,12]]],
            "p2Units":[[[14,23,60.0,"9"]],[],[],[],[],[],[],[]]
        }"#
        .replace('\n', "");
        let Inbound::Turn(doc) = parse_state(&line).unwrap() else {
            panic!("not a turn");
        };
        let state = game_state_from_turn(&doc, &catalog).unwrap();

        assert_eq!(state.turn, 7);
        assert_eq!(state.player(Side::Bottom).health, 27.0);
        assert_eq!(state.player(Side::Bottom).resources.sp, 12.5);
        assert_eq!(state.player(Side::Top).resources.mp, 11.0);

        let (_, wall) = state.map.structure_at(Cell::new(3, 12)).unwrap();
        assert_eq!(wall.kind, UnitKind::Wall);
        assert!(wall.upgraded);
        assert_eq!(wall.health, 75.0);

        let (_, turret) = state.map.structure_at(Cell::new(7, 8)).unwrap();
        assert_eq!(turret.kind, UnitKind::Turret);
        assert!(!turret.upgraded);

        let (_, enemy) = state.map.structure_at(Cell::new(14, 23)).unwrap();
        assert_eq!(enemy.side, Side::Top);
    }

    #[test]
    fn frame_document_reports_breaches() {
        let line = r#"{
            "turnInfo":[1,7,12],
            "events":{"breach":[[[13,0],1.0,3,"5",2],[[14,27],1.0,3,"6",1]],"spawn":[]}
        }"#
        .replace('\n', "");
        let Inbound::Frame(doc) = parse_state(&line).unwrap() else {
            panic!("not a frame");
        };
        let hits = breaches(&doc);
        assert_eq!(
            hits,
            vec![(Cell::new(13, 0), true), (Cell::new(14, 27), false)]
        );
    }

    #[test]
    fn unexpected_turn_info_is_an_error() {
        assert!(parse_state(r#"{"turnInfo":[9]}"#).is_err());
        assert!(parse_state("not json").is_err());
    }

    #[test]
    fn submission_splits_structures_from_deployments() {
        let catalog = wire_catalog();
        let mut submission = TurnSubmission::default();
        submission.push(Command::Spawn {
            kind: UnitKind::Turret,
            cell: Cell::new(3, 12),
        });
        submission.push(Command::Upgrade {
            cell: Cell::new(3, 12),
        });
        submission.push(Command::Remove {
            cell: Cell::new(6, 10),
        });
        submission.push(Command::Spawn {
            kind: UnitKind::Scout,
            cell: Cell::new(13, 0),
        });

        let mut out = Vec::new();
        submission.submit(&mut out, &catalog).unwrap();
        let text = String::from_utf8(out).unwrap();
        let mut lines = text.lines();
        assert_eq!(
            lines.next().unwrap(),
            r#"[["DF",3,12],["UP",3,12],["RM",6,10]]"#
        );
        assert_eq!(lines.next().unwrap(), r#"[["PI",13,0]]"#);
    }

    #[test]
    fn empty_submission_is_well_formed() {
        let catalog = wire_catalog();
        let submission = TurnSubmission::default();
        let mut out = Vec::new();
        submission.submit(&mut out, &catalog).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "[]\n[]\n");
    }
}
