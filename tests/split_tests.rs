use image::RgbImage;
use std::fs;
use std::path::Path;

use detect2yolo::split::{collect_pairs, create_data_yaml};
use detect2yolo::{CurateError, SplitRatios, Splitter};

fn write_pair(dir: &Path, stem: &str, label: &str) {
    RgbImage::new(4, 4).save(dir.join(format!("{}.jpg", stem))).unwrap();
    fs::write(dir.join(format!("{}.txt", stem)), label).unwrap();
}

fn count_files(dir: &Path, ext: &str) -> usize {
    fs::read_dir(dir)
        .unwrap()
        .filter(|e| {
            e.as_ref()
                .unwrap()
                .path()
                .extension()
                .is_some_and(|x| x == ext)
        })
        .count()
}

#[test]
fn test_collect_pairs_skips_unlabeled() {
    let temp_dir = tempfile::tempdir().unwrap();
    let pool = temp_dir.path();
    write_pair(pool, "a", "0 0.5 0.5 0.1 0.1\n");
    RgbImage::new(4, 4).save(pool.join("b.png")).unwrap();

    let pairs = collect_pairs(pool).unwrap();
    assert_eq!(pairs.len(), 1);
    assert_eq!(pairs[0].label, pool.join("a.txt"));
}

#[test]
fn test_splitter_copies_and_writes_manifest() {
    let temp_dir = tempfile::tempdir().unwrap();
    let pool = temp_dir.path().join("pool");
    let output = temp_dir.path().join("dataset");
    fs::create_dir_all(&pool).unwrap();
    for i in 0..10 {
        // float class ids and short precision get normalized on copy
        write_pair(&pool, &format!("s{}", i), &format!("{}.0 0.5 0.25 0.1 0.2\n", i % 3));
    }

    let splitter = Splitter {
        input: pool.clone(),
        output: output.clone(),
        ratios: SplitRatios {
            train: 0.6,
            val: 0.2,
            test: 0.2,
        },
        seed: 42,
        batch_name: "batch".to_string(),
        names: Vec::new(),
    };
    let split = splitter.run().unwrap();
    assert_eq!(split.train.len(), 6);
    assert_eq!(split.val.len(), 2);
    assert_eq!(split.test.len(), 2);

    assert_eq!(count_files(&output.join("train"), "jpg"), 6);
    assert_eq!(count_files(&output.join("train"), "txt"), 6);
    assert_eq!(count_files(&output.join("val"), "jpg"), 2);
    assert_eq!(count_files(&output.join("test"), "txt"), 2);

    let stem = split.val[0].image.file_stem().unwrap().to_string_lossy().into_owned();
    let copied = fs::read_to_string(output.join("val").join(format!("{}_batch.txt", stem))).unwrap();
    let (class, geometry) = copied.split_once(' ').unwrap();
    assert!(class.parse::<u32>().is_ok());
    assert_eq!(geometry, "0.500000 0.250000 0.100000 0.200000\n");

    let yaml = fs::read_to_string(output.join("data.yaml")).unwrap();
    assert!(yaml.contains("path:"));
    assert!(yaml.contains("train: train"));
    assert!(yaml.contains("val: val"));
    assert!(yaml.contains("test: test"));
    assert!(yaml.contains("nc: 3"));
    assert!(yaml.contains("    2: 2"));
}

#[test]
fn test_splitter_rejects_bad_ratios_before_copying() {
    let temp_dir = tempfile::tempdir().unwrap();
    let output = temp_dir.path().join("dataset");
    let splitter = Splitter {
        input: temp_dir.path().to_path_buf(),
        output: output.clone(),
        ratios: SplitRatios {
            train: 0.8,
            val: 0.1,
            test: 0.0,
        },
        seed: 1,
        batch_name: "b".to_string(),
        names: Vec::new(),
    };
    assert!(matches!(splitter.run(), Err(CurateError::InvalidSplit(_))));
    assert!(!output.exists());
}

#[test]
fn test_create_data_yaml_with_names() {
    let temp_dir = tempfile::tempdir().unwrap();
    let names = vec!["zero".to_string(), "one".to_string()];
    let path = create_data_yaml(temp_dir.path(), &names).unwrap();

    let yaml = fs::read_to_string(path).unwrap();
    assert!(yaml.contains("nc: 2"));
    assert!(yaml.contains("names:\n    0: zero\n    1: one\n"));
}
