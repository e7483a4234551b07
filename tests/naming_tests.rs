use std::collections::HashSet;
use std::fs;
use std::path::Path;

use posefit::naming::{self, NameCase, PlanOptions, PlanWarning};
use posefit::DiskFs;
use tempfile::TempDir;

fn touch(dir: &Path, name: &str) {
    fs::write(dir.join(name), b"video").unwrap();
}

fn write_labels(dir: &Path, rows: &str) -> std::path::PathBuf {
    let path = dir.join("labels.csv");
    let mut content = "\u{feff}VIDEO,LABEL,FOLDER_NAME,ID\n".to_string();
    content.push_str(rows);
    fs::write(&path, content).unwrap();
    path
}

fn names_in(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

#[test]
fn test_plan_and_apply_from_label_file() {
    let temp = TempDir::new().unwrap();
    let videos = temp.path().join("Videos");
    fs::create_dir(&videos).unwrap();
    for name in ["D0001N.mp4", "D0002N.mp4", "D0003N.mp4"] {
        touch(&videos, name);
    }
    let labels = write_labels(
        temp.path(),
        "D0001N.mp4,Jump Roll,Rolls,\n\
         D0002N.mp4,Jump Roll,Rolls,7\n\
         D0003N.mp4,Jump Roll,Rolls,7\n\
         D0009N.mp4,Missing,Rolls,\n",
    );

    let records = naming::load_labels(&labels).unwrap();
    let plan = naming::plan(&records, &DiskFs, &videos, &PlanOptions::default()).unwrap();

    assert_eq!(plan.entries.len(), 3);
    assert_eq!(
        plan.warnings,
        vec![PlanWarning::NotFound {
            video: "D0009N.mp4".into()
        }]
    );

    let report = naming::apply(&plan);
    assert_eq!(report.renamed, 3);
    assert!(report.failed.is_empty());
    assert_eq!(
        names_in(&videos),
        vec!["Jump Roll (2).mp4", "Jump Roll.mp4", "Jump Roll_7.mp4"]
    );
}

#[test]
fn test_applying_twice_renames_nothing_the_second_time() {
    let temp = TempDir::new().unwrap();
    let videos = temp.path().join("Videos");
    fs::create_dir(&videos).unwrap();
    touch(&videos, "clip_a.mp4");
    touch(&videos, "clip_b.mp4");
    let labels = write_labels(temp.path(), "clip_a.mp4,Walk,,\nclip_b.mp4,Run,,\n");
    let records = naming::load_labels(&labels).unwrap();

    let plan = naming::plan(&records, &DiskFs, &videos, &PlanOptions::default()).unwrap();
    let first = naming::apply(&plan);
    assert_eq!(first.renamed, 2);

    // Same plan again: sources are gone and destinations exist.
    let second = naming::apply(&plan);
    assert_eq!(second.renamed, 0);
    assert_eq!(second.unchanged, 2);
    assert!(second.failed.is_empty());

    // Fresh plan over the renamed folder: the old names resolve to nothing.
    let replan = naming::plan(&records, &DiskFs, &videos, &PlanOptions::default()).unwrap();
    assert!(replan.entries.is_empty());
    let third = naming::apply(&replan);
    assert_eq!((third.renamed, third.failed.len()), (0, 0));
    assert_eq!(names_in(&videos), vec!["Run.mp4", "Walk.mp4"]);
}

#[test]
fn test_every_resolvable_row_gets_a_distinct_destination() {
    let temp = TempDir::new().unwrap();
    let videos = temp.path().join("Videos");
    fs::create_dir(&videos).unwrap();
    touch(&videos, "Hop.mp4");

    let mut rows = String::new();
    for i in 0..12 {
        let name = format!("v{:02}.mp4", i);
        touch(&videos, &name);
        let id = if i % 3 == 0 { String::new() } else { (i % 2).to_string() };
        rows.push_str(&format!("{},Hop,,{}\n", name, id));
    }
    let records = naming::load_labels(&write_labels(temp.path(), &rows)).unwrap();

    let plan = naming::plan(&records, &DiskFs, &videos, &PlanOptions::default()).unwrap();
    assert_eq!(plan.entries.len(), 12);

    let destinations: HashSet<String> = plan
        .entries
        .iter()
        .map(|e| e.destination.to_string_lossy().to_lowercase())
        .collect();
    assert_eq!(destinations.len(), 12);
    assert!(!destinations.contains(&videos.join("hop.mp4").to_string_lossy().to_lowercase()));

    let report = naming::apply(&plan);
    assert_eq!(report.renamed, 12);
    assert!(report.failed.is_empty());
    assert_eq!(names_in(&videos).len(), 13);
}

#[test]
fn test_lowercase_names_and_folder_grouping() {
    let temp = TempDir::new().unwrap();
    let videos = temp.path().join("Videos");
    fs::create_dir(&videos).unwrap();
    touch(&videos, "a.mp4");
    touch(&videos, "b.mp4");
    let labels = write_labels(temp.path(), "a.mp4,Jump Roll,Rolls,\nb.mp4,Jump Roll,Rolls,7\n");
    let records = naming::load_labels(&labels).unwrap();

    let options = PlanOptions {
        name_case: NameCase::Lower,
        group_by_folder: true,
        ..PlanOptions::default()
    };
    let plan = naming::plan(&records, &DiskFs, &videos, &options).unwrap();
    let report = naming::apply(&plan);

    assert_eq!(report.renamed, 2);
    assert_eq!(
        names_in(&videos.join("Rolls")),
        vec!["jump roll.mp4", "jump roll_7.mp4"]
    );
}

#[test]
fn test_existing_destination_is_never_overwritten() {
    let temp = TempDir::new().unwrap();
    let videos = temp.path().join("Videos");
    fs::create_dir(&videos).unwrap();
    touch(&videos, "a.mp4");
    let labels = write_labels(temp.path(), "a.mp4,Walk,,\n");
    let records = naming::load_labels(&labels).unwrap();
    let plan = naming::plan(&records, &DiskFs, &videos, &PlanOptions::default()).unwrap();

    // Someone drops a file at the destination between plan and apply.
    fs::write(videos.join("Walk.mp4"), b"other").unwrap();
    let report = naming::apply(&plan);

    assert_eq!(report.renamed, 0);
    assert_eq!(report.failed.len(), 1);
    assert_eq!(fs::read(videos.join("Walk.mp4")).unwrap(), b"other");
    assert!(videos.join("a.mp4").exists());
}

#[test]
fn test_file_already_carrying_its_label_is_left_alone() {
    let temp = TempDir::new().unwrap();
    let videos = temp.path().join("Videos");
    fs::create_dir(&videos).unwrap();
    touch(&videos, "Walk.mp4");
    let labels = write_labels(temp.path(), "Walk.mp4,Walk,,\n");
    let records = naming::load_labels(&labels).unwrap();

    let plan = naming::plan(&records, &DiskFs, &videos, &PlanOptions::default()).unwrap();
    assert_eq!(plan.entries.len(), 1);
    assert_eq!(plan.entries[0].source, plan.entries[0].destination);

    let report = naming::apply(&plan);
    assert_eq!(
        (report.renamed, report.unchanged, report.failed.len()),
        (0, 1, 0)
    );
    assert_eq!(names_in(&videos), vec!["Walk.mp4"]);
}

#[test]
fn test_case_only_rename_is_applied() {
    let temp = TempDir::new().unwrap();
    let videos = temp.path().join("Videos");
    fs::create_dir(&videos).unwrap();
    touch(&videos, "walk.mp4");
    let labels = write_labels(temp.path(), "walk.mp4,Walk,,\n");
    let records = naming::load_labels(&labels).unwrap();

    let plan = naming::plan(&records, &DiskFs, &videos, &PlanOptions::default()).unwrap();
    assert_eq!(plan.entries[0].destination, videos.join("Walk.mp4"));

    let report = naming::apply(&plan);
    assert_eq!(
        (report.renamed, report.unchanged, report.failed.len()),
        (1, 0, 0)
    );
    assert_eq!(names_in(&videos), vec!["Walk.mp4"]);
}
