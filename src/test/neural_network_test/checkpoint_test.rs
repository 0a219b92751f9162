use super::*;
use crate::error::IoError;
use std::path::PathBuf;

fn scratch_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!(
        "hanzi_bigru_{}_{}",
        name,
        std::process::id()
    ));
    let _ = std::fs::remove_dir_all(&dir);
    dir
}

#[test]
fn test_checkpoint_file_names() {
    assert_eq!(CheckpointLabel::Iteration(0).file_name(), "parameters_0.json");
    assert_eq!(CheckpointLabel::Iteration(300).file_name(), "parameters_300.json");
    assert_eq!(CheckpointLabel::Final.file_name(), "parameters_final.json");
}

#[test]
fn test_checkpoint_round_trip_restores_identical_outputs() {
    let model = tiny_model(vec![3, 2], 42);
    let dir = scratch_dir("round_trip");

    let path = Checkpoint::from_model(CheckpointLabel::Iteration(200), &model)
        .save_in_dir(&dir)
        .unwrap();
    assert!(path.ends_with("parameters_200.json"));

    let checkpoint = Checkpoint::load_from_path(&path).unwrap();
    assert_eq!(checkpoint.label(), CheckpointLabel::Iteration(200));
    assert!(checkpoint.parameters.contains_key("encoder_r:1/W_z"));

    let restored =
        BiGruModel::from_registry(model.config().clone(), checkpoint.into_registry().unwrap())
            .unwrap();
    assert_eq!(restored, model);

    let source = array![[0, 1, 2], [3, 3, 0]];
    let expected = model.forward(source.view()).unwrap();
    let actual = restored.forward(source.view()).unwrap();
    assert_eq!(expected, actual);

    std::fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn test_checkpoint_rejects_unknown_names_and_bad_shapes() {
    let mut checkpoint = Checkpoint::from_model(CheckpointLabel::Final, &tiny_model(vec![2], 1));
    assert_eq!(checkpoint.label(), CheckpointLabel::Final);

    let mut renamed = checkpoint.clone();
    let value = renamed.parameters.remove("W_o").unwrap();
    renamed.parameters.insert("decoder/W".to_string(), value);
    assert!(matches!(
        renamed.into_registry(),
        Err(ModelError::UnexpectedParameter(_))
    ));

    checkpoint.parameters.get_mut("b_o").unwrap().shape = vec![4, 4];
    assert!(matches!(
        checkpoint.into_registry(),
        Err(ModelError::InputValidationError(_))
    ));
}

#[test]
fn test_checkpoint_load_missing_file() {
    let dir = scratch_dir("missing");
    assert!(Checkpoint::load_from_path(dir.join("parameters_final.json")).is_err());
}

#[test]
fn test_checkpoint_load_rejects_repeated_parameter_names() {
    let dir = scratch_dir("repeated");
    std::fs::create_dir_all(&dir).unwrap();
    let path = dir.join("parameters_final.json");

    std::fs::write(
        &path,
        r#"{ "iteration": null, "parameters": {
            "b_o": { "shape": [2], "values": [0.0, 1.0] },
            "b_o": { "shape": [2], "values": [5.0, 5.0] }
        } }"#,
    )
    .unwrap();
    assert!(matches!(
        Checkpoint::load_from_path(&path),
        Err(IoError::JsonError(_))
    ));

    std::fs::write(
        &path,
        r#"{ "iteration": 7, "parameters": {
            "b_o": { "shape": [2], "values": [0.0, 1.0] }
        } }"#,
    )
    .unwrap();
    let checkpoint = Checkpoint::load_from_path(&path).unwrap();
    assert_eq!(checkpoint.label(), CheckpointLabel::Iteration(7));
    assert_eq!(checkpoint.parameters["b_o"].values, vec![0.0, 1.0]);

    std::fs::remove_dir_all(&dir).unwrap();
}
