use super::*;

fn toy_batch() -> (Array2<usize>, Array3<f32>) {
    let source = array![[1, 3, 0], [2, 2, 1]];
    let mut target = Array3::<f32>::zeros((2, 3, 5));
    for (b, row) in [[4, 0, 2], [1, 1, 3]].iter().enumerate() {
        for (t, &id) in row.iter().enumerate() {
            target[[b, t, id]] = 1.0;
        }
    }
    (source, target)
}

fn perturbed_cost(
    model: &BiGruModel,
    key: ParamKey,
    index: usize,
    delta: f32,
    source: &Array2<usize>,
    target: &Array3<f32>,
    gamma: f32,
) -> f64 {
    let mut shifted = model.clone();
    for (k, mut value) in shifted.parameters_mut() {
        if k == key {
            if let Some(v) = value.iter_mut().nth(index) {
                *v += delta;
            }
        }
    }
    shifted
        .cost(source.view(), target.view(), gamma)
        .unwrap()
        .cost as f64
}

#[test]
fn test_gradients_match_finite_differences() {
    let model = tiny_model(vec![3, 2], 77);
    let (source, target) = toy_batch();
    let gamma = 0.5;

    let (cost, gradients) = Backpropagation::new()
        .gradients(&model, source.view(), target.view(), gamma)
        .unwrap();
    let reference = model.cost(source.view(), target.view(), gamma).unwrap();
    assert_relative_eq!(cost.cost, reference.cost, epsilon = 1e-6);
    assert_eq!(gradients.len(), model.parameters().len());

    let h = 1e-2;
    for (key, value) in model.parameters() {
        let grad = gradients.get(&key).unwrap();
        assert_eq!(grad.shape(), value.shape());
        let n = value.len();
        for index in [0, n / 2, n - 1] {
            let analytic = grad.iter().nth(index).copied().unwrap();
            let plus = perturbed_cost(&model, key, index, h, &source, &target, gamma);
            let minus = perturbed_cost(&model, key, index, -h, &source, &target, gamma);
            let numeric = ((plus - minus) / (2.0 * h as f64)) as f32;
            assert!(
                (analytic - numeric).abs() <= 1e-3 + 2e-2 * analytic.abs(),
                "{} [{}]: analytic {} vs numeric {}",
                key,
                index,
                analytic,
                numeric
            );
        }
    }
}

#[test]
fn test_embedding_gradient_only_touches_used_rows() {
    let model = tiny_model(vec![2], 8);
    // symbol 3 never appears
    let source = array![[0, 1, 2]];
    let mut target = Array3::<f32>::zeros((1, 3, 5));
    target[[0, 0, 1]] = 1.0;
    target[[0, 1, 2]] = 1.0;
    target[[0, 2, 3]] = 1.0;

    let (_, gradients) = Backpropagation::new()
        .gradients(&model, source.view(), target.view(), 0.0)
        .unwrap();
    let grad = gradients
        .get(&ParamKey::Embedding)
        .unwrap()
        .view()
        .into_dimensionality::<Ix2>()
        .unwrap();
    assert!(grad.row(3).iter().all(|&v| v == 0.0));
    assert!(grad.row(0).iter().any(|&v| v != 0.0));
}

#[test]
fn test_embedding_backward_scatter_adds_repeated_ids() {
    let mut rng = StdRng::seed_from_u64(1);
    let embedding = Embedding::new(3, 2, Some(0.1), &mut rng).unwrap();
    let ids = array![[1, 1, 0]];
    let grad_embedded = array![[[1.0, 2.0], [10.0, 20.0], [5.0, 5.0]]];
    let grad = embedding.backward(ids.view(), grad_embedded.view()).unwrap();
    assert_matrices_close(&grad, &array![[5.0, 5.0], [11.0, 22.0], [0.0, 0.0]], 0.0);

    assert!(embedding.lookup(array![[3]].view()).is_err());
}
