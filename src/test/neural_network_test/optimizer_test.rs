use super::*;

#[test]
fn test_adam_new() {
    assert!(Adam::new(0.01, 0.9, 0.999, 1e-8).is_ok());

    // Invalid learning rate
    assert!(Adam::new(0.0, 0.9, 0.999, 1e-8).is_err());
    assert!(Adam::new(-0.01, 0.9, 0.999, 1e-8).is_err());

    // Invalid decay rates
    assert!(Adam::new(0.01, -0.1, 0.999, 1e-8).is_err());
    assert!(Adam::new(0.01, 0.9, 1.0, 1e-8).is_err());

    // Invalid epsilon
    assert!(Adam::new(0.01, 0.9, 0.999, 0.0).is_err());
}

#[test]
fn test_adam_first_step_moves_by_learning_rate() {
    let mut model = tiny_model(vec![3], 17);
    let before = model.to_registry().unwrap();

    let mut gradients = zero_gradients(&model);
    let keys: Vec<ParamKey> = gradients.keys().copied().collect();
    for (i, key) in keys.iter().enumerate() {
        let value = if i % 2 == 0 { 0.25 } else { -4.0 };
        gradients.get_mut(key).unwrap().fill(value);
    }

    let mut adam = Adam::new(0.01, 0.9, 0.999, 1e-8).unwrap();
    adam.step(&mut model, &gradients).unwrap();
    assert_eq!(adam.timestep(), 1);

    // with bias correction the first update is lr * g / (|g| + eps)
    let after = model.to_registry().unwrap();
    for (i, key) in keys.iter().enumerate() {
        let sign = if i % 2 == 0 { 1.0 } else { -1.0 };
        let old = before.get(key).unwrap();
        let new = after.get(key).unwrap();
        for (o, n) in old.iter().zip(new.iter()) {
            assert_abs_diff_eq!(o - n, sign * 0.01, epsilon = 1e-5);
        }
        let state = adam.state(key).unwrap();
        assert_eq!(state.m.shape(), old.shape());
    }
}

#[test]
fn test_adam_zero_gradient_leaves_parameters() {
    let mut model = tiny_model(vec![2, 2], 3);
    let before = model.to_registry().unwrap();
    let mut adam = Adam::new(0.1, 0.9, 0.999, 1e-8).unwrap();
    let gradients = zero_gradients(&model);
    adam.step(&mut model, &gradients).unwrap();
    assert_eq!(model.to_registry().unwrap(), before);
}

#[test]
fn test_adam_rejects_incomplete_gradients_without_updating() {
    let mut model = tiny_model(vec![2], 5);
    let before = model.to_registry().unwrap();
    let mut adam = Adam::new(0.1, 0.9, 0.999, 1e-8).unwrap();

    // missing
    let mut gradients = zero_gradients(&model);
    gradients.take(ParamKey::OutputBias).unwrap();
    gradients.get_mut(&ParamKey::Embedding).unwrap().fill(1.0);
    let result = adam.step(&mut model, &gradients);
    assert_eq!(result, Err(ModelError::MissingParameter(ParamKey::OutputBias)));

    // unexpected
    let mut gradients = zero_gradients(&model);
    let extra = ParamKey::Cell {
        direction: Direction::Forward,
        layer: 7,
        param: CellParam::UpdateBias,
    };
    gradients.insert(extra, Tensor::zeros(vec![2])).unwrap();
    let result = adam.step(&mut model, &gradients);
    assert!(matches!(result, Err(ModelError::UnexpectedParameter(_))));

    // wrong shape
    let mut gradients = zero_gradients(&model);
    *gradients.get_mut(&ParamKey::OutputWeight).unwrap() = Tensor::zeros(vec![1, 1]);
    let result = adam.step(&mut model, &gradients);
    assert!(matches!(result, Err(ModelError::InputValidationError(_))));

    assert_eq!(adam.timestep(), 0);
    assert_eq!(model.to_registry().unwrap(), before);
}

#[test]
fn test_adam_states_follow_moment_recurrence() {
    let values = |t: &Tensor| t.iter().copied().collect::<Vec<f32>>();
    let mut states = AdamStates::new(&[2]);
    let grad = array![1.0f32, -2.0].into_dyn();

    let first = values(&states.update_parameter(&grad, 0.9, 0.999, 1e-8, 1, 0.1));
    assert_abs_diff_eq!(values(&states.m)[0], 0.1, epsilon = 1e-7);
    assert_abs_diff_eq!(values(&states.v)[1], 0.004, epsilon = 1e-7);
    assert_abs_diff_eq!(first[0], 0.1, epsilon = 1e-5);
    assert_abs_diff_eq!(first[1], -0.1, epsilon = 1e-5);

    let second = values(&states.update_parameter(&grad, 0.9, 0.999, 1e-8, 2, 0.1));
    // a constant gradient keeps m_hat / sqrt(v_hat) at sign(g)
    assert_abs_diff_eq!(second[0], 0.1, epsilon = 1e-5);
    assert_abs_diff_eq!(second[1], -0.1, epsilon = 1e-5);
}
