use ffnet::{Dataset, Init, Loss, NetworkBuilder, Tensor, TrainConfig, Trainer};

fn main() -> ffnet::Result<()> {
    // XOR as a two-class problem.
    let xs = vec![
        vec![0.0, 0.0, 1.0],
        vec![0.0, 1.0, 1.0],
        vec![1.0, 0.0, 1.0],
        vec![1.0, 1.0, 1.0],
    ];
    let ys = vec![
        vec![1.0, 0.0],
        vec![0.0, 1.0],
        vec![0.0, 1.0],
        vec![1.0, 0.0],
    ];
    let train = Dataset::from_rows(&xs, &ys)?;

    // 3 -> 8 -> 2 network. Layers have no bias; the constant third input
    // column stands in for one.
    let net = NetworkBuilder::new(3)?
        .linear(8, Init::He)?
        .relu()
        .linear(2, Init::Xavier)?
        .softmax()
        .build_with_seed(0)?;

    let mut trainer = Trainer::new(
        net,
        Loss::CrossEntropy,
        TrainConfig {
            epochs: 500,
            learning_rate: 0.1,
            log_every: 10_000,
            eval_every: None,
            ..TrainConfig::default()
        },
    )?;
    let report = trainer.fit(&train, Some(&train))?;

    let last = report.epochs.last().expect("at least one epoch");
    println!(
        "final_loss={} train_accuracy={}% eval={:?}",
        last.mean_loss, last.train_accuracy, last.eval
    );

    let net = trainer.network();
    for x in xs {
        let probs = net.predict(&Tensor::new(vec![1, 3], x.clone())?)?;
        println!("x={x:?} p={:?}", probs.as_slice());
    }

    Ok(())
}
