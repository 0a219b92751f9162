use super::*;

fn zero_cell(n_input: usize, n_hidden: usize) -> GRUCell {
    let id = CellId::new(Direction::Forward, 0);
    let mut registry = ParameterRegistry::new();
    for param in CellParam::ALL {
        let value = match param {
            CellParam::UpdateBias | CellParam::ResetBias | CellParam::CandidateBias => {
                Tensor::zeros(vec![n_hidden])
            }
            _ => Tensor::zeros(vec![n_hidden + n_input, n_hidden]),
        };
        registry.insert(id.key(param), value).unwrap();
    }
    let cell = GRUCell::from_registry(id, n_input, n_hidden, &mut registry).unwrap();
    assert!(registry.is_empty());
    cell
}

#[test]
fn test_gru_cell_output_shape_and_gate_ranges() {
    let mut rng = StdRng::seed_from_u64(11);
    let cell = GRUCell::new(CellId::new(Direction::Forward, 0), 4, 3, Some(0.8), &mut rng).unwrap();

    let h = Array2::from_shape_fn((2, 3), |(b, j)| (b as f32 - j as f32) * 0.4);
    let x = ramp_input(2, 1, 4).index_axis(Axis(1), 0).to_owned();
    let step = cell.step(&h, &x).unwrap();

    assert_eq!(step.h.dim(), (2, 3));
    assert_eq!(step.hx.dim(), (2, 7));
    // pre-activations stay moderate here, so the gates are strictly inside (0, 1)
    assert!(step.z.iter().all(|&v| v > 0.0 && v < 1.0));
    assert!(step.r.iter().all(|&v| v > 0.0 && v < 1.0));
    assert!(step.h_candidate.iter().all(|&v| (-1.0..=1.0).contains(&v)));

    // the new state interpolates between the old state and the candidate
    for ((&new, &old), &candidate) in step.h.iter().zip(h.iter()).zip(step.h_candidate.iter()) {
        assert!(new >= old.min(candidate) - 1e-6);
        assert!(new <= old.max(candidate) + 1e-6);
    }

    let h_new = cell.forward(&h, &x).unwrap();
    assert_matrices_close(&h_new, &step.h, 0.0);
}

#[test]
fn test_gru_cell_with_zero_parameters_halves_the_state() {
    // z = r = 0.5 and the candidate is tanh(0) = 0
    let cell = zero_cell(2, 2);
    let h = array![[1.0, -2.0], [0.5, 0.0]];
    let x = array![[3.0, 4.0], [-1.0, 2.0]];
    let h_new = cell.forward(&h, &x).unwrap();
    assert_matrices_close(&h_new, &array![[0.5, -1.0], [0.25, 0.0]], 1e-6);
}

#[test]
fn test_gru_cell_rejects_bad_inputs() {
    let mut rng = StdRng::seed_from_u64(2);
    let cell = GRUCell::new(CellId::new(Direction::Backward, 1), 4, 3, None, &mut rng).unwrap();

    let h = Array2::<f32>::zeros((2, 3));
    assert!(cell.forward(&h, &Array2::zeros((2, 5))).is_err());
    assert!(cell.forward(&Array2::zeros((2, 4)), &Array2::zeros((2, 4))).is_err());
    assert!(cell.forward(&h, &Array2::zeros((3, 4))).is_err());

    assert!(GRUCell::new(CellId::new(Direction::Forward, 0), 0, 3, None, &mut rng).is_err());
    assert!(GRUCell::new(CellId::new(Direction::Forward, 0), 4, 0, None, &mut rng).is_err());
}

#[test]
fn test_gru_cell_parameter_keys_and_shapes() {
    let mut rng = StdRng::seed_from_u64(4);
    let cell = GRUCell::new(CellId::new(Direction::Backward, 1), 5, 2, Some(0.1), &mut rng).unwrap();
    let params = cell.parameters();
    assert_eq!(params.len(), 6);

    let names: Vec<String> = params.iter().map(|(key, _)| key.to_string()).collect();
    assert_eq!(
        names,
        vec![
            "encoder_r:1/W_z",
            "encoder_r:1/b_z",
            "encoder_r:1/W_r",
            "encoder_r:1/b_r",
            "encoder_r:1/W_c",
            "encoder_r:1/b_c",
        ]
    );
    for (key, value) in &params {
        match key {
            ParamKey::Cell { param, .. } if param.name().starts_with('W') => {
                assert_eq!(value.shape(), &[7, 2])
            }
            _ => assert_eq!(value.shape(), &[2]),
        }
    }
    // biases start at zero, weights stay inside the initialization radius
    assert!(cell.update_gate().bias.iter().all(|&b| b == 0.0));
    assert!(cell.candidate_gate().weight.iter().all(|&w| w.abs() <= 0.1));
}

#[test]
fn test_gru_cell_from_registry_reports_missing_and_misshaped() {
    let id = CellId::new(Direction::Forward, 0);
    let mut registry = ParameterRegistry::new();
    let result = GRUCell::from_registry(id, 2, 2, &mut registry);
    assert!(matches!(result, Err(ModelError::MissingParameter(_))));

    let mut registry = ParameterRegistry::new();
    for param in CellParam::ALL {
        registry.insert(id.key(param), Tensor::zeros(vec![3, 3])).unwrap();
    }
    let result = GRUCell::from_registry(id, 2, 2, &mut registry);
    assert!(matches!(result, Err(ModelError::InputValidationError(_))));
}

#[test]
fn test_sigmoid_saturates_at_the_bounds() {
    use crate::math::sigmoid;

    assert!(sigmoid(5.0) < 1.0);
    assert!(sigmoid(-5.0) > 0.0);
    assert_eq!(sigmoid(20.0), 1.0);
    assert_eq!(sigmoid(-120.0), 0.0);
    assert_eq!(sigmoid(f32::MAX), 1.0);
    assert!((0.0..=1.0).contains(&sigmoid(-1e4)));
}
