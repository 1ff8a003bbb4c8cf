//! File-system game catalog
//!
//! Stored games live under `<root>/<player>/<date>/<game>.pgn`. The
//! catalog only ever reads below its root; request strings are validated
//! before they touch a path.

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::parser::{parse_pgn_file, PgnGame};

/// One date directory and the games recorded under it
#[derive(Debug, Clone)]
pub struct DateEntry {
    pub date: String,
    pub games: Vec<String>,
}

/// One player directory and its dates, newest first
#[derive(Debug, Clone)]
pub struct PlayerEntry {
    pub name: String,
    pub dates: Vec<DateEntry>,
}

pub struct GameCatalog {
    root: PathBuf,
}

impl GameCatalog {
    pub fn new<P: Into<PathBuf>>(root: P) -> Self {
        GameCatalog { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Lists every player with their dates and game files.
    ///
    /// Players sort ascending, dates newest first, games ascending.
    /// A missing root directory yields an empty catalog so a fresh
    /// deployment still renders.
    pub fn list_players(&self) -> Result<Vec<PlayerEntry>> {
        if !self.root.is_dir() {
            return Ok(Vec::new());
        }

        let mut players = Vec::new();
        for entry in fs::read_dir(&self.root)? {
            let entry = entry?;
            if !entry.file_type()?.is_dir() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().into_owned();

            let mut dates = Vec::new();
            for date_entry in fs::read_dir(entry.path())? {
                let date_entry = date_entry?;
                if !date_entry.file_type()?.is_dir() {
                    continue;
                }
                let date = date_entry.file_name().to_string_lossy().into_owned();

                let mut games: Vec<String> = fs::read_dir(date_entry.path())?
                    .filter_map(|e| e.ok())
                    .filter(|e| e.path().extension().is_some_and(|ext| ext == "pgn"))
                    .map(|e| e.file_name().to_string_lossy().into_owned())
                    .collect();
                games.sort();

                dates.push(DateEntry { date, games });
            }
            dates.sort_by(|a, b| b.date.cmp(&a.date));

            players.push(PlayerEntry { name, dates });
        }
        players.sort_by(|a, b| a.name.cmp(&b.name));

        Ok(players)
    }

    /// Loads the first game of a stored PGN file.
    pub fn load_game(&self, player: &str, date: &str, filename: &str) -> Result<PgnGame> {
        let not_found = || Error::GameNotFound(format!("{}/{}/{}", player, date, filename));

        for part in [player, date, filename] {
            if !is_safe_component(part) {
                return Err(not_found());
            }
        }

        let path = self.root.join(player).join(date).join(filename);
        if !path.is_file() {
            return Err(not_found());
        }

        let games = parse_pgn_file(&path)?;
        games.into_iter().next().ok_or_else(not_found)
    }
}

/// A request string may only name a plain directory entry.
fn is_safe_component(part: &str) -> bool {
    !part.is_empty()
        && part != "."
        && part != ".."
        && !part.contains(['/', '\\', '\0'])
}
