use super::labels::LabelRecord;
use super::sanitize::sanitize_label;
use crate::error::Error;
use crate::listing::Listing;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use thiserror::Error as ThisError;
use tracing::{debug, warn};

/// How to pick a new name when the label's name is already taken.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CollisionStrategy {
    /// Try `label_<id>` first, then ` (2)`, ` (3)`, ...
    #[default]
    IdThenCounter,
    /// Only ` (2)`, ` (3)`, ...
    Counter,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NameCase {
    #[default]
    Preserve,
    Lower,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlanOptions {
    pub case_sensitive: bool,
    pub collision: CollisionStrategy,
    pub name_case: NameCase,
    /// Place each file under `<video dir>/<FOLDER_NAME>/` when the row has one.
    pub group_by_folder: bool,
}

impl Default for PlanOptions {
    fn default() -> Self {
        Self {
            case_sensitive: true,
            collision: CollisionStrategy::default(),
            name_case: NameCase::default(),
            group_by_folder: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenameEntry {
    pub source: PathBuf,
    pub destination: PathBuf,
    pub label: String,
}

/// A label row that did not make it into the plan.
#[derive(ThisError, Debug, Clone, PartialEq, Eq)]
pub enum PlanWarning {
    #[error("Not found: {video}")]
    NotFound { video: String },

    #[error("Case mismatch for '{video}'. Actual file is '{actual}'.")]
    CaseMismatch { video: String, actual: String },

    #[error("Empty/invalid label '{label}' for {video}")]
    InvalidLabel { video: String, label: String },

    #[error("'{video}' is already planned by an earlier row")]
    DuplicateSource { video: String },
}

#[derive(Debug, Default)]
pub struct RenamePlan {
    pub entries: Vec<RenameEntry>,
    pub warnings: Vec<PlanWarning>,
}

/// Names already present in, or handed out for, one destination directory.
/// Keys are lowercased so a plan stays collision-free on case-insensitive
/// filesystems.
#[derive(Debug, Default)]
struct DirClaims {
    existing: HashSet<String>,
    assigned: HashSet<String>,
}

impl DirClaims {
    fn is_free(&self, name: &str, own_source: Option<&str>) -> bool {
        let key = name.to_lowercase();
        if self.assigned.contains(&key) {
            return false;
        }
        !self.existing.contains(&key) || own_source == Some(key.as_str())
    }

    fn assign(&mut self, name: &str) {
        self.assigned.insert(name.to_lowercase());
    }
}

/// Compute a collision-free rename plan for `video_dir` without touching
/// the filesystem.
///
/// Rows are resolved in order and each assignment is visible to the rows
/// after it. A destination never equals an existing file other than the
/// entry's own source.
pub fn plan(
    records: &[LabelRecord],
    listing: &dyn Listing,
    video_dir: &Path,
    options: &PlanOptions,
) -> Result<RenamePlan, Error> {
    if !listing.is_dir(video_dir) {
        return Err(Error::missing("Video folder", video_dir));
    }

    let files: Vec<String> = listing
        .list(video_dir)?
        .into_iter()
        .filter(|e| e.is_file())
        .map(|e| e.name)
        .collect();
    let exact: HashSet<&str> = files.iter().map(String::as_str).collect();
    let mut by_lower: HashMap<String, &str> = HashMap::new();
    for name in &files {
        by_lower.entry(name.to_lowercase()).or_insert(name.as_str());
    }

    let mut claims: HashMap<PathBuf, DirClaims> = HashMap::new();
    let mut planned_sources: HashSet<String> = HashSet::new();
    let mut result = RenamePlan::default();

    for record in records {
        let wanted = record.video.trim();

        let actual = if exact.contains(wanted) {
            wanted
        } else {
            match by_lower.get(&wanted.to_lowercase()) {
                Some(found) if options.case_sensitive => {
                    result.warnings.push(PlanWarning::CaseMismatch {
                        video: wanted.to_string(),
                        actual: found.to_string(),
                    });
                    continue;
                }
                Some(found) => *found,
                None => {
                    result.warnings.push(PlanWarning::NotFound {
                        video: wanted.to_string(),
                    });
                    continue;
                }
            }
        };

        if planned_sources.contains(actual) {
            result.warnings.push(PlanWarning::DuplicateSource {
                video: actual.to_string(),
            });
            continue;
        }

        let mut base = sanitize_label(&record.label);
        if options.name_case == NameCase::Lower {
            base = base.to_lowercase();
        }
        if base.is_empty() {
            result.warnings.push(PlanWarning::InvalidLabel {
                video: actual.to_string(),
                label: record.label.clone(),
            });
            continue;
        }

        let target_dir = target_dir_for(record, video_dir, options);
        let dir_claims = claims.entry(target_dir.clone()).or_insert_with(|| {
            let mut dc = DirClaims::default();
            if let Ok(entries) = listing.list(&target_dir) {
                dc.existing = entries.into_iter().map(|e| e.name.to_lowercase()).collect();
            }
            dc
        });

        let source = video_dir.join(actual);
        let ext = source
            .extension()
            .map(|e| format!(".{}", e.to_string_lossy()))
            .unwrap_or_default();
        let own_key = (target_dir == video_dir).then(|| actual.to_lowercase());
        let id = record
            .id
            .as_deref()
            .map(sanitize_label)
            .filter(|id| !id.is_empty());

        let name = choose_name(
            dir_claims,
            &base,
            &ext,
            id.as_deref(),
            options.collision,
            own_key.as_deref(),
        );
        dir_claims.assign(&name);

        planned_sources.insert(actual.to_string());
        debug!("Planned {} -> {}", actual, name);
        result.entries.push(RenameEntry {
            source,
            destination: target_dir.join(&name),
            label: record.label.clone(),
        });
    }

    for warning in &result.warnings {
        warn!("[SKIP] {}", warning);
    }
    Ok(result)
}

fn target_dir_for(record: &LabelRecord, video_dir: &Path, options: &PlanOptions) -> PathBuf {
    if !options.group_by_folder {
        return video_dir.to_path_buf();
    }
    match record.folder.as_deref().map(sanitize_label) {
        Some(folder) if !folder.is_empty() => video_dir.join(folder),
        _ => video_dir.to_path_buf(),
    }
}

fn choose_name(
    claims: &DirClaims,
    base: &str,
    ext: &str,
    id: Option<&str>,
    strategy: CollisionStrategy,
    own_source: Option<&str>,
) -> String {
    let candidate = format!("{}{}", base, ext);
    if claims.is_free(&candidate, own_source) {
        return candidate;
    }

    if strategy == CollisionStrategy::IdThenCounter {
        if let Some(id) = id {
            let with_id = format!("{}_{}{}", base, id, ext);
            if claims.is_free(&with_id, own_source) {
                return with_id;
            }
        }
    }

    let mut n = 2;
    loop {
        let numbered = format!("{} ({}){}", base, n, ext);
        if claims.is_free(&numbered, own_source) {
            return numbered;
        }
        n += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::listing::MemFs;

    fn videos(names: &[&str]) -> MemFs {
        let mut fs = MemFs::new();
        fs.add_dir("/v");
        for name in names {
            fs.add_file(Path::new("/v").join(name));
        }
        fs
    }

    fn dest_names(plan: &RenamePlan) -> Vec<String> {
        plan.entries
            .iter()
            .map(|e| e.destination.file_name().unwrap().to_string_lossy().into_owned())
            .collect()
    }

    #[test]
    fn test_counter_suffixes_in_row_order() {
        let fs = videos(&["a.mp4", "b.mp4", "c.mp4"]);
        let rows = vec![
            LabelRecord::new("a.mp4", "Walk"),
            LabelRecord::new("b.mp4", "Walk"),
            LabelRecord::new("c.mp4", "Walk"),
        ];
        let plan = plan(&rows, &fs, Path::new("/v"), &PlanOptions::default()).unwrap();
        assert_eq!(dest_names(&plan), vec!["Walk.mp4", "Walk (2).mp4", "Walk (3).mp4"]);
        assert!(plan.warnings.is_empty());
    }

    #[test]
    fn test_id_disambiguates_before_counter() {
        let fs = videos(&["clip0.mp4", "clip1.mp4"]);
        let rows = vec![
            LabelRecord::new("clip0.mp4", "jump roll"),
            LabelRecord::new("clip1.mp4", "Jump / Roll").with_id("7"),
        ];
        let options = PlanOptions {
            name_case: NameCase::Lower,
            ..Default::default()
        };
        let plan = plan(&rows, &fs, Path::new("/v"), &options).unwrap();
        assert_eq!(dest_names(&plan), vec!["jump roll.mp4", "jump roll_7.mp4"]);
        assert_eq!(plan.entries[1].source, PathBuf::from("/v/clip1.mp4"));
        assert_eq!(plan.entries[1].label, "Jump / Roll");
    }

    #[test]
    fn test_counter_strategy_ignores_id() {
        let fs = videos(&["a.mp4", "b.mp4"]);
        let rows = vec![
            LabelRecord::new("a.mp4", "Run"),
            LabelRecord::new("b.mp4", "Run").with_id("9"),
        ];
        let options = PlanOptions {
            collision: CollisionStrategy::Counter,
            ..Default::default()
        };
        let plan = plan(&rows, &fs, Path::new("/v"), &options).unwrap();
        assert_eq!(dest_names(&plan), vec!["Run.mp4", "Run (2).mp4"]);
    }

    #[test]
    fn test_taken_id_name_falls_through_to_counter() {
        let fs = videos(&["a.mp4", "Run.mp4", "Run_1.mp4"]);
        let rows = vec![LabelRecord::new("a.mp4", "Run").with_id("1")];
        let plan = plan(&rows, &fs, Path::new("/v"), &PlanOptions::default()).unwrap();
        assert_eq!(dest_names(&plan), vec!["Run (2).mp4"]);
    }

    #[test]
    fn test_existing_files_are_claimed_case_insensitively() {
        let fs = videos(&["a.mp4", "WALK.mp4"]);
        let rows = vec![LabelRecord::new("a.mp4", "walk")];
        let plan = plan(&rows, &fs, Path::new("/v"), &PlanOptions::default()).unwrap();
        assert_eq!(dest_names(&plan), vec!["walk (2).mp4"]);
    }

    #[test]
    fn test_own_source_name_is_not_a_collision() {
        let fs = videos(&["Walk.mp4"]);
        let rows = vec![LabelRecord::new("Walk.mp4", "Walk")];
        let plan = plan(&rows, &fs, Path::new("/v"), &PlanOptions::default()).unwrap();
        assert_eq!(plan.entries[0].source, plan.entries[0].destination);
    }

    #[test]
    fn test_case_mismatch_is_warned_not_corrected() {
        let fs = videos(&["Clip1.mp4"]);
        let rows = vec![LabelRecord::new("clip1.mp4", "Walk")];
        let plan = plan(&rows, &fs, Path::new("/v"), &PlanOptions::default()).unwrap();
        assert!(plan.entries.is_empty());
        assert_eq!(
            plan.warnings,
            vec![PlanWarning::CaseMismatch {
                video: "clip1.mp4".into(),
                actual: "Clip1.mp4".into()
            }]
        );
    }

    #[test]
    fn test_case_insensitive_lookup_when_allowed() {
        let fs = videos(&["Clip1.mp4"]);
        let rows = vec![LabelRecord::new("clip1.mp4", "Walk")];
        let options = PlanOptions {
            case_sensitive: false,
            ..Default::default()
        };
        let plan = plan(&rows, &fs, Path::new("/v"), &options).unwrap();
        assert!(plan.warnings.is_empty());
        assert_eq!(plan.entries[0].source, PathBuf::from("/v/Clip1.mp4"));
    }

    #[test]
    fn test_not_found_invalid_label_and_duplicate_rows() {
        let fs = videos(&["a.mp4", "b.mp4"]);
        let rows = vec![
            LabelRecord::new("missing.mp4", "X"),
            LabelRecord::new("a.mp4", " ?? "),
            LabelRecord::new("b.mp4", "First"),
            LabelRecord::new("b.mp4", "Second"),
        ];
        let plan = plan(&rows, &fs, Path::new("/v"), &PlanOptions::default()).unwrap();
        assert_eq!(dest_names(&plan), vec!["First.mp4"]);
        assert_eq!(plan.warnings.len(), 3);
        assert!(matches!(plan.warnings[0], PlanWarning::NotFound { .. }));
        assert!(matches!(plan.warnings[1], PlanWarning::InvalidLabel { .. }));
        assert!(matches!(plan.warnings[2], PlanWarning::DuplicateSource { .. }));
    }

    #[test]
    fn test_group_by_folder_tracks_claims_per_folder() {
        let mut fs = videos(&["a.mp4", "b.mp4", "c.mp4"]);
        fs.add_file("/v/Jumps/Jump.mp4");
        let rows = vec![
            LabelRecord::new("a.mp4", "Jump").with_folder("Jumps"),
            LabelRecord::new("b.mp4", "Jump").with_folder("Other"),
            LabelRecord::new("c.mp4", "Jump"),
        ];
        let options = PlanOptions {
            group_by_folder: true,
            ..Default::default()
        };
        let plan = plan(&rows, &fs, Path::new("/v"), &options).unwrap();
        let dests: Vec<PathBuf> = plan.entries.iter().map(|e| e.destination.clone()).collect();
        assert_eq!(
            dests,
            vec![
                PathBuf::from("/v/Jumps/Jump (2).mp4"),
                PathBuf::from("/v/Other/Jump.mp4"),
                PathBuf::from("/v/Jump.mp4"),
            ]
        );
    }

    #[test]
    fn test_missing_video_dir_is_config_error() {
        let fs = MemFs::new();
        let err = plan(&[], &fs, Path::new("/v"), &PlanOptions::default()).unwrap_err();
        assert!(matches!(err, Error::MissingPath { .. }));
    }
}
