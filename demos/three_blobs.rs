use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use ffnet::{Dataset, Init, Loss, LrSchedule, NetworkBuilder, TrainConfig, Trainer};

fn main() -> ffnet::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    // Three noisy 2D blobs, one per class. A constant 1.0 feature is appended
    // so the bias-free first layer can still shift its decision boundaries.
    let mut rng = StdRng::seed_from_u64(0);

    let centers = [[-1.0_f32, -1.0], [1.0, -1.0], [0.0, 1.0]];
    let n_per_class = 128;
    let mut xs = Vec::with_capacity(3 * n_per_class);
    let mut ys = Vec::with_capacity(3 * n_per_class);

    for (class, center) in centers.iter().enumerate() {
        for _ in 0..n_per_class {
            let x0 = center[0] + rng.gen_range(-0.3..0.3);
            let x1 = center[1] + rng.gen_range(-0.3..0.3);
            xs.push(vec![x0, x1, 1.0]);

            let mut one_hot = vec![0.0_f32; 3];
            one_hot[class] = 1.0;
            ys.push(one_hot);
        }
    }

    let train = Dataset::from_rows(&xs, &ys)?;

    let net = NetworkBuilder::classifier(&[3, 16, 3], Init::He)?.build_with_seed(0)?;
    let mut trainer = Trainer::new(
        net,
        Loss::CrossEntropy,
        TrainConfig {
            epochs: 20,
            learning_rate: 0.05,
            lr_schedule: LrSchedule::Step {
                step_size: 5,
                gamma: 0.5,
            },
            log_every: 128,
            eval_every: None,
        },
    )?;
    let report = trainer.fit(&train, Some(&train))?;

    for epoch in &report.epochs {
        println!(
            "epoch={} lr={} loss={} train_acc={}%",
            epoch.epoch, epoch.learning_rate, epoch.mean_loss, epoch.train_accuracy
        );
    }

    Ok(())
}
