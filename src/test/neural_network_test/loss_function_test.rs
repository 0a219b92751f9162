use super::*;
use crate::math::EPSILON;

fn one_hot(ids: &[[usize; 2]], classes: usize) -> Array3<f32> {
    let mut y = Array3::<f32>::zeros((ids.len(), 2, classes));
    for (b, row) in ids.iter().enumerate() {
        for (t, &id) in row.iter().enumerate() {
            y[[b, t, id]] = 1.0;
        }
    }
    y
}

#[test]
fn test_projection_outputs_are_distributions() {
    let mut rng = StdRng::seed_from_u64(3);
    let projection = OutputProjection::new(4, 6, Some(2.0), &mut rng).unwrap();
    let context = ramp_input(3, 5, 4).mapv(|v| v * 10.0);
    let probabilities = projection.forward(context.view()).unwrap();

    assert_eq!(probabilities.dim(), (3, 5, 6));
    for lane in probabilities.lanes(Axis(2)) {
        assert_relative_eq!(lane.sum(), 1.0, epsilon = 1e-5);
        assert!(lane.iter().all(|&p| p >= 0.0));
    }

    assert!(projection.forward(ramp_input(1, 2, 3).view()).is_err());
}

#[test]
fn test_categorical_cross_entropy_uniform_prediction() {
    let y = one_hot(&[[0, 3], [2, 1]], 4);
    let p = Array3::<f32>::from_elem((2, 2, 4), 0.25);
    let loss = CategoricalCrossEntropy::new()
        .compute_loss(y.view(), p.view())
        .unwrap();
    assert_relative_eq!(loss, 4.0f32.ln(), epsilon = 1e-6);
}

#[test]
fn test_categorical_cross_entropy_guards_zero_probability() {
    let y = one_hot(&[[1, 1]], 2);
    let mut p = Array3::<f32>::zeros((1, 2, 2));
    p[[0, 0, 0]] = 1.0;
    p[[0, 1, 1]] = 1.0;

    let loss = CategoricalCrossEntropy::new()
        .compute_loss(y.view(), p.view())
        .unwrap();
    assert!(loss.is_finite());
    assert_relative_eq!(loss, -EPSILON.ln() / 2.0, epsilon = 1e-4);
}

#[test]
fn test_categorical_cross_entropy_shape_mismatch() {
    let y = Array3::<f32>::zeros((1, 2, 3));
    let p = Array3::<f32>::zeros((1, 2, 4));
    let loss_function = CategoricalCrossEntropy::new();
    assert!(loss_function.compute_loss(y.view(), p.view()).is_err());
    assert!(loss_function.compute_logit_grad(y.view(), p.view()).is_err());
}

#[test]
fn test_logit_gradient_is_scaled_residual() {
    let y = one_hot(&[[0, 1], [1, 0]], 2);
    let p = array![[[0.7, 0.3], [0.4, 0.6]], [[0.2, 0.8], [0.5, 0.5]]];
    let grad = CategoricalCrossEntropy::new()
        .compute_logit_grad(y.view(), p.view())
        .unwrap();
    let expected = (&p - &y) / 4.0;
    for (g, e) in grad.iter().zip(expected.iter()) {
        assert_abs_diff_eq!(*g, *e, epsilon = 1e-7);
    }
}

#[test]
fn test_l2_regularizer_averages_tensor_means() {
    let a = array![1.0f32, -1.0].into_dyn();
    let b = array![[2.0f32, 0.0]].into_dyn();
    let value = l2_regularizer([a.view(), b.view()]).unwrap();
    // (mean(1, 1) + mean(4, 0)) / 2
    assert_relative_eq!(value, 1.5);

    let grad = l2_regularizer_grad(b.view(), 2, 0.5);
    assert_eq!(grad.shape(), &[1, 2]);
    let grad: Vec<f32> = grad.iter().copied().collect();
    assert_relative_eq!(grad[0], 0.5 * 2.0 * 2.0 / 4.0);
    assert_relative_eq!(grad[1], 0.0);

    assert!(l2_regularizer(Vec::<ArrayViewD<f32>>::new()).is_err());
}

#[test]
fn test_cost_combine_and_display() {
    let cost = Cost::combine(2.0, 0.5, 2.0).unwrap();
    assert_relative_eq!(cost.cost, 3.0);
    assert_eq!(
        cost.to_string(),
        "cost 3.00000, loss 2.00000, parameter regularizer 0.50000"
    );

    let result = Cost::combine(f32::NAN, 0.5, 1.0);
    assert!(matches!(result, Err(ModelError::NumericalError(_))));
}

#[test]
fn test_model_cost_includes_weighted_regularizer() {
    let model = tiny_model(vec![2], 6);
    let source = array![[1, 2, 3], [0, 0, 1]];
    let mut target = Array3::<f32>::zeros((2, 3, 5));
    for b in 0..2 {
        for t in 0..3 {
            target[[b, t, (b + t) % 5]] = 1.0;
        }
    }
    let plain = model.cost(source.view(), target.view(), 0.0).unwrap();
    let weighted = model.cost(source.view(), target.view(), 3.0).unwrap();

    assert_relative_eq!(plain.cost, plain.loss);
    assert_relative_eq!(weighted.loss, plain.loss);
    assert_relative_eq!(
        weighted.cost,
        plain.loss + 3.0 * model.regularizer().unwrap(),
        epsilon = 1e-6
    );
    assert!(plain.loss > 0.0);
}
