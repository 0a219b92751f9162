use super::*;

fn stack(direction: Direction, sizes: &[usize], input_dim: usize, seed: u64) -> Vec<GRUCell> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut cells = Vec::new();
    let mut n_input = input_dim;
    for (layer, &units) in sizes.iter().enumerate() {
        cells.push(
            GRUCell::new(CellId::new(direction, layer), n_input, units, Some(0.6), &mut rng)
                .unwrap(),
        );
        n_input = units;
    }
    cells
}

#[test]
fn test_build_encoder_layers_shapes() {
    let cells = stack(Direction::Forward, &[4, 2], 3, 1);
    let input = ramp_input(2, 5, 3);
    let layers = build_encoder_layers(input.view(), &cells, false).unwrap();

    assert_eq!(layers.len(), 2);
    assert!(layers.iter().all(|layer| layer.len() == 5));
    assert!(layers[0].iter().all(|h| h.dim() == (2, 4)));
    assert!(layers[1].iter().all(|h| h.dim() == (2, 2)));
}

#[test]
fn test_reversed_unroll_equals_unroll_of_reversed_input() {
    let cells = stack(Direction::Backward, &[3, 3], 2, 9);
    let input = ramp_input(3, 4, 2);
    let reversed = input.slice(s![.., ..;-1, ..]).to_owned();

    let from_flag = build_encoder_layers(input.view(), &cells, true).unwrap();
    let from_reversed = build_encoder_layers(reversed.view(), &cells, false).unwrap();

    for (a, b) in from_flag.iter().zip(from_reversed.iter()) {
        for (h_a, h_b) in a.iter().zip(b.iter()) {
            assert_matrices_close(h_a, h_b, 1e-6);
        }
    }
}

#[test]
fn test_first_step_starts_from_zero_state() {
    let cells = stack(Direction::Forward, &[3], 2, 5);
    let input = ramp_input(1, 3, 2);
    let layers = build_encoder_layers(input.view(), &cells, false).unwrap();

    let x0 = input.index_axis(Axis(1), 0).to_owned();
    let expected = cells[0].forward(&Array2::zeros((1, 3)), &x0).unwrap();
    assert_matrices_close(&layers[0][0], &expected, 1e-6);
}

#[test]
fn test_trace_matches_plain_unroll() {
    let cells = stack(Direction::Forward, &[2, 3], 3, 21);
    let input = ramp_input(2, 4, 3);
    let plain = build_encoder_layers(input.view(), &cells, true).unwrap();
    let traced = trace_encoder_layers(input.view(), &cells, true).unwrap();
    for (a, b) in plain.iter().zip(traced.iter()) {
        for (h, step) in a.iter().zip(b.iter()) {
            assert_matrices_close(h, &step.h, 0.0);
        }
    }
}

#[test]
fn test_empty_stack_is_rejected() {
    let input = ramp_input(1, 2, 2);
    assert!(build_encoder_layers(input.view(), &[], false).is_err());
}

#[test]
fn test_bidirectional_context_pairs_mirrored_iterations() {
    let steps = 3;
    let forward: Vec<Array2<f32>> = (0..steps).map(|t| array![[t as f32]]).collect();
    let backward: Vec<Array2<f32>> = (0..steps)
        .map(|k| array![[10.0 + k as f32, 20.0 + k as f32]])
        .collect();

    let context = bidirectional_context(&forward, &backward).unwrap();
    assert_eq!(context.dim(), (1, 3, 3));
    for t in 0..steps {
        assert_eq!(context[[0, t, 0]], t as f32);
        // the backward stack reached position t at iteration steps - 1 - t
        assert_eq!(context[[0, t, 1]], 10.0 + (steps - 1 - t) as f32);
        assert_eq!(context[[0, t, 2]], 20.0 + (steps - 1 - t) as f32);
    }

    let (grad_forward, grad_backward) = split_context_gradient(context.view(), 1);
    for t in 0..steps {
        assert_matrices_close(&grad_forward[t], &forward[t], 0.0);
        assert_matrices_close(&grad_backward[t], &backward[t], 0.0);
    }

    assert!(bidirectional_context(&forward, &backward[..2]).is_err());
}

#[test]
fn test_encoder_context_width() {
    let mut rng = StdRng::seed_from_u64(8);
    let encoder = BidirectionalEncoder::new(3, &[4, 5], Some(0.3), &mut rng).unwrap();
    assert_eq!(encoder.top_hidden(), 5);
    assert_eq!(encoder.context_dim(), 10);
    assert_eq!(encoder.cells(Direction::Backward).len(), 2);

    let context = encoder.encode(ramp_input(2, 6, 3).view()).unwrap();
    assert_eq!(context.dim(), (2, 6, 10));
    assert!(context.iter().all(|v| v.abs() < 1.0));

    assert!(BidirectionalEncoder::new(3, &[], None, &mut rng).is_err());
}

#[test]
fn test_layer_input_dims_chain_the_stack() {
    assert_eq!(layer_input_dims(3, &[4, 5, 2]), vec![3, 4, 5]);
    assert_eq!(layer_input_dims(7, &[1]), vec![7]);
    assert!(layer_input_dims(7, &[]).is_empty());

    let mut rng = StdRng::seed_from_u64(21);
    let encoder = BidirectionalEncoder::new(3, &[4, 5, 2], None, &mut rng).unwrap();
    for direction in [Direction::Forward, Direction::Backward] {
        let widths: Vec<usize> = encoder.cells(direction).iter().map(|c| c.n_input()).collect();
        assert_eq!(widths, vec![3, 4, 5]);
    }
}
