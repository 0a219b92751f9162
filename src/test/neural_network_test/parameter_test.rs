use super::*;

#[test]
fn test_param_key_names() {
    let cases = [
        (ParamKey::Embedding, "embedding"),
        (ParamKey::OutputWeight, "W_o"),
        (ParamKey::OutputBias, "b_o"),
        (CellId::new(Direction::Forward, 0).key(CellParam::UpdateWeight), "encoder:0/W_z"),
        (CellId::new(Direction::Backward, 2).key(CellParam::CandidateBias), "encoder_r:2/b_c"),
    ];
    for (key, name) in cases {
        assert_eq!(key.to_string(), name);
        assert_eq!(name.parse::<ParamKey>().unwrap(), key);
    }

    for bad in ["", "W_z", "decoder:0/W_z", "encoder:x/W_z", "encoder:0/W_q", "encoder_r:1"] {
        assert!(matches!(
            bad.parse::<ParamKey>(),
            Err(ModelError::UnexpectedParameter(_))
        ));
    }
}

#[test]
fn test_registry_rejects_duplicates() {
    let mut registry = ParameterRegistry::new();
    registry.insert(ParamKey::OutputBias, Tensor::ones(vec![2])).unwrap();

    let result = registry.insert(ParamKey::OutputBias, Tensor::zeros(vec![2]));
    assert_eq!(result, Err(ModelError::DuplicateParameter(ParamKey::OutputBias)));
    // the first value is kept
    assert!(registry.get(&ParamKey::OutputBias).unwrap().iter().all(|&v| v == 1.0));

    let mut other = ParameterRegistry::new();
    other.insert(ParamKey::Embedding, Tensor::zeros(vec![1, 1])).unwrap();
    other.insert(ParamKey::OutputBias, Tensor::zeros(vec![2])).unwrap();
    assert!(registry.merge(other).is_err());
    assert_eq!(registry.len(), 1);
}

#[test]
fn test_registry_take_checks_presence_and_shape() {
    let mut registry = ParameterRegistry::new();
    registry.insert(ParamKey::OutputWeight, Tensor::zeros(vec![3, 2])).unwrap();
    registry.insert(ParamKey::OutputBias, Tensor::zeros(vec![2])).unwrap();

    assert!(matches!(
        registry.take_matrix(ParamKey::OutputWeight, 2, 3),
        Err(ModelError::InputValidationError(_))
    ));
    assert_eq!(registry.take_vector(ParamKey::OutputBias, 2).unwrap().len(), 2);
    assert_eq!(
        registry.take(ParamKey::Embedding),
        Err(ModelError::MissingParameter(ParamKey::Embedding))
    );
    assert!(registry.is_empty());
    assert!(registry.ensure_consumed().is_ok());
}

#[test]
fn test_registry_accumulate() {
    let mut registry = ParameterRegistry::new();
    registry.insert(ParamKey::OutputBias, Tensor::ones(vec![2])).unwrap();
    registry
        .accumulate(ParamKey::OutputBias, &Tensor::from_elem(vec![2], 0.5))
        .unwrap();
    assert!(registry.get(&ParamKey::OutputBias).unwrap().iter().all(|&v| v == 1.5));

    assert!(
        registry
            .accumulate(ParamKey::OutputBias, &Tensor::zeros(vec![3]))
            .is_err()
    );
    assert_eq!(
        registry.accumulate(ParamKey::OutputWeight, &Tensor::zeros(vec![2])),
        Err(ModelError::MissingParameter(ParamKey::OutputWeight))
    );
}

#[test]
fn test_model_registry_key_set() {
    let model = tiny_model(vec![4, 3], 12);
    let registry = model.to_registry().unwrap();
    // embedding + 2 directions * 2 layers * 6 + W_o + b_o
    assert_eq!(registry.len(), 27);
    assert!(registry.contains(&"encoder_r:1/W_c".parse().unwrap()));
    assert_eq!(registry.get(&ParamKey::Embedding).unwrap().shape(), &[4, 3]);
    assert_eq!(registry.get(&ParamKey::OutputWeight).unwrap().shape(), &[6, 5]);
    assert_eq!(
        registry
            .get(&CellId::new(Direction::Forward, 1).key(CellParam::UpdateWeight))
            .unwrap()
            .shape(),
        &[7, 3]
    );
}

#[test]
fn test_model_from_registry_exact_key_set() {
    let model = tiny_model(vec![2], 1);
    let config = model.config().clone();

    let restored = BiGruModel::from_registry(config.clone(), model.to_registry().unwrap()).unwrap();
    assert_eq!(restored, model);

    let mut missing = model.to_registry().unwrap();
    missing.take(ParamKey::OutputBias).unwrap();
    assert_eq!(
        BiGruModel::from_registry(config.clone(), missing),
        Err(ModelError::MissingParameter(ParamKey::OutputBias))
    );

    let mut extra = model.to_registry().unwrap();
    extra
        .insert(
            CellId::new(Direction::Backward, 1).key(CellParam::ResetBias),
            Tensor::zeros(vec![2]),
        )
        .unwrap();
    assert_eq!(
        BiGruModel::from_registry(config, extra),
        Err(ModelError::UnexpectedParameter("encoder_r:1/b_r".to_string()))
    );
}
