use super::*;
use crate::config::TrainingConfig;
use crate::dataset::{AlignedPair, DatasetSplit, Vocabulary, VocabularyPair};

fn toy_vocab() -> VocabularyPair {
    VocabularyPair {
        source: Vocabulary::from_symbols("#ab".chars()).unwrap(),
        target: Vocabulary::from_symbols("#.xy".chars()).unwrap(),
    }
}

fn toy_model(seed: u64) -> BiGruModel {
    let config = ModelConfig {
        source_vocab_size: 3,
        embed_dim: 4,
        n_output: 4,
        n_step_input: 3,
        n_hidden: vec![6],
        weight_stddev: Some(0.3),
    };
    BiGruModel::new(config, &mut StdRng::seed_from_u64(seed)).unwrap()
}

fn toy_dataset() -> DatasetSplit {
    DatasetSplit {
        train: vec![
            AlignedPair::new("ab#", "xy."),
            AlignedPair::new("ba#", "yx."),
            AlignedPair::new("aa#", "xx."),
            AlignedPair::new("bb#", "yy."),
        ],
        validation: vec![AlignedPair::new("ab#", "xy."), AlignedPair::new("bb#", "yy.")],
        test: vec![AlignedPair::new("ba#", "yx."), AlignedPair::new("aa#", "xx.")],
    }
}

fn scratch_dir(name: &str) -> std::path::PathBuf {
    let dir = std::env::temp_dir().join(format!(
        "hanzi_bigru_{}_{}",
        name,
        std::process::id()
    ));
    let _ = std::fs::remove_dir_all(&dir);
    dir
}

#[test]
fn test_schedule_counts_and_triggers() {
    let schedule = TrainingSchedule::new(1, 1000, 100, 100, 100).unwrap();
    assert_eq!(schedule.total_iterations(), 10);
    let validated: Vec<usize> = (0..10).filter(|&i| schedule.should_validate(i)).collect();
    assert_eq!(validated, vec![0]);

    let schedule = TrainingSchedule::new(3, 10, 4, 2, 5).unwrap();
    assert_eq!(schedule.total_iterations(), 7);
    let validated: Vec<usize> = (0..7).filter(|&i| schedule.should_validate(i)).collect();
    let saved: Vec<usize> = (0..7).filter(|&i| schedule.should_checkpoint(i)).collect();
    assert_eq!(validated, vec![0, 2, 4, 6]);
    assert_eq!(saved, vec![0, 5]);

    assert_eq!(TrainingSchedule::new(1, 3, 10, 1, 1).unwrap().total_iterations(), 0);
    assert!(TrainingSchedule::new(1, 10, 0, 1, 1).is_err());
    assert!(TrainingSchedule::new(1, 10, 2, 0, 1).is_err());
}

#[test]
fn test_sample_batch_is_a_seeded_partial_permutation() {
    let config = TrainingConfig {
        batch_size: 4,
        seed: 9,
        ..TrainingConfig::default()
    };
    let mut first = Trainer::new(config.clone(), "unused").unwrap();
    let mut second = Trainer::new(config, "unused").unwrap();

    for _ in 0..5 {
        let batch = first.sample_batch(10);
        assert_eq!(batch.len(), 4);
        assert!(batch.iter().all(|&i| i < 10));
        let mut unique = batch.clone();
        unique.sort_unstable();
        unique.dedup();
        assert_eq!(unique.len(), 4);
        assert_eq!(batch, second.sample_batch(10));
    }
    assert_eq!(first.sample_batch(3).len(), 3);
}

#[test]
fn test_train_step_reduces_loss_on_a_tiny_set() {
    let vocab = toy_vocab();
    let pairs = toy_dataset().train;
    let mut model = toy_model(4);
    let config = TrainingConfig {
        batch_size: 4,
        learning_rate: 0.05,
        gamma: 0.0,
        ..TrainingConfig::default()
    };
    let mut trainer = Trainer::new(config, "unused").unwrap().with_progress_bar(false);

    let initial = trainer.train_step(&mut model, &pairs, &vocab).unwrap();
    let mut last = initial;
    for _ in 0..100 {
        last = trainer.train_step(&mut model, &pairs, &vocab).unwrap();
    }
    assert!(last.loss < 0.5 * initial.loss);
    assert_eq!(trainer.optimizer().timestep(), 101);
    assert_eq!(last.cost, last.loss);
}

#[test]
fn test_evaluate_cost_is_independent_of_chunk_size() {
    let vocab = toy_vocab();
    let pairs = toy_dataset().train;
    let model = toy_model(2);

    let whole = evaluate_cost(&model, &pairs, &vocab, 1.0, pairs.len()).unwrap();
    let chunked = evaluate_cost(&model, &pairs, &vocab, 1.0, 3).unwrap();
    assert_relative_eq!(whole.loss, chunked.loss, epsilon = 1e-6);
    assert_relative_eq!(whole.cost, chunked.cost, epsilon = 1e-6);

    assert!(evaluate_cost(&model, &[], &vocab, 1.0, 3).is_err());
}

#[test]
fn test_fit_writes_checkpoints_and_reports() {
    let vocab = toy_vocab();
    let dataset = toy_dataset();
    let mut model = toy_model(13);
    let dir = scratch_dir("fit");
    let config = TrainingConfig {
        n_epoch: 2,
        batch_size: 2,
        validation_steps: 2,
        save_param_steps: 3,
        ..TrainingConfig::default()
    };
    let mut trainer = Trainer::new(config, &dir).unwrap().with_progress_bar(false);
    let report = trainer.fit(&mut model, &dataset, &vocab).unwrap();

    assert_eq!(report.iterations, 4);
    assert_eq!(report.samples_seen, 8);
    let validated: Vec<usize> = report.validation_history.iter().map(|(i, _)| *i).collect();
    assert_eq!(validated, vec![0, 2]);
    assert!(report.last_batch_cost.is_some());
    assert!(report.test_loss.is_some_and(|loss| loss > 0.0));

    assert!(dir.join("parameters_0.json").is_file());
    assert!(dir.join("parameters_3.json").is_file());
    assert!(!dir.join("parameters_2.json").exists());
    assert_eq!(report.final_checkpoint, dir.join("parameters_final.json"));

    let restored = BiGruModel::from_registry(
        model.config().clone(),
        Checkpoint::load_from_path(&report.final_checkpoint)
            .unwrap()
            .into_registry()
            .unwrap(),
    )
    .unwrap();
    assert_eq!(restored, model);

    std::fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn test_fit_rejects_malformed_dataset() {
    let vocab = toy_vocab();
    let mut dataset = toy_dataset();
    dataset.validation.push(AlignedPair::new("abc", "xy."));
    let mut model = toy_model(1);
    let dir = scratch_dir("fit_malformed");
    let mut trainer = Trainer::new(TrainingConfig::default(), &dir)
        .unwrap()
        .with_progress_bar(false);
    assert!(trainer.fit(&mut model, &dataset, &vocab).is_err());
    assert!(!dir.exists());
}
