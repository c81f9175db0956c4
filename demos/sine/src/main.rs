#[macro_use]
extern crate log;

use std::{error::Error, time::Instant};

use common::{Activation, SequenceBatch};
use dialoguer::{theme::ColorfulTheme, Select};
use esn::{
    AntisymmetricGenerator, NormalGenerator, Params, UniformGenerator, WeightSource, ESN,
};
use lin_reg::LearningAlgo;
use nalgebra::{DMatrix, Dim, Matrix};
use time_series_generator::generate_sine_wave;

const TRAIN_LEN: usize = 600;
const HIDDEN_DIM: usize = 200;
const WASHOUT: usize = 50;
const SEED: Option<u64> = Some(0);

fn main() {
    pretty_env_logger::init();

    if let Err(e) = run() {
        error!("sine demo failed: {}", e);
        std::process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn Error>> {
    let mut values: Vec<f64> = generate_sine_wave(100);
    values.append(&mut values.clone());
    values.append(&mut values.clone());
    values.append(&mut values.clone());
    info!("got {} datapoints", values.len());

    let values: DMatrix<f64> =
        Matrix::from_vec_generic(Dim::from_usize(values.len()), Dim::from_usize(1), values);

    let generators = vec!["uniform", "normal", "antisymmetric"];
    let g = Select::with_theme(&ColorfulTheme::default())
        .with_prompt("Select internal weight generator")
        .items(&generators)
        .default(0)
        .interact()?;
    let w = match g {
        0 => WeightSource::generator(UniformGenerator::new(SEED, 0.1, 1.0)),
        1 => WeightSource::generator(NormalGenerator::new(SEED, 0.1, 0.0, 1.0)),
        _ => WeightSource::generator(AntisymmetricGenerator::new(SEED, 1.0, 0.0001)),
    };
    let w_in = WeightSource::generator(UniformGenerator::new(SEED.map(|s| s + 1), 1.0, 1.0));
    let w_bias = WeightSource::generator(UniformGenerator::new(SEED.map(|s| s + 2), 1.0, 1.0));

    let mut params = Params::new(1, HIDDEN_DIM, 1);
    params.spectral_radius = 0.9;
    params.input_scaling = 0.5;
    params.bias_scaling = 0.1;
    params.nonlin_func = Activation::Tanh;
    params.learning_algo = LearningAlgo::PseudoInverse;
    params.ridge_param = 0.001;
    params.washout = WASHOUT;
    let mut esn = ESN::new(params, w, w_in, w_bias)?;

    // one step ahead: the target is the input shifted by one
    let train_u = SequenceBatch::from_sequence(values.rows(0, TRAIN_LEN - 1).clone_owned());
    let train_y = SequenceBatch::from_sequence(values.rows(1, TRAIN_LEN - 1).clone_owned());

    let t0 = Instant::now();
    esn.train(&train_u, &train_y)?;
    esn.finalize()?;
    info!("training done in: {}ms", t0.elapsed().as_millis());

    let n_test = values.nrows() - TRAIN_LEN;
    let test_u = SequenceBatch::from_sequence(values.rows(TRAIN_LEN - 1, n_test).clone_owned());
    let test_y = values.rows(TRAIN_LEN + WASHOUT, n_test - WASHOUT);
    let preds = esn.predict(&test_u)?;
    let preds = preds.into_sequences().remove(0);

    let rmse = (preds
        .iter()
        .zip(test_y.iter())
        .map(|(p, t)| (p - t).powi(2))
        .sum::<f64>()
        / (n_test - WASHOUT) as f64)
        .sqrt();
    info!("test rmse over {} steps: {:.6}", n_test - WASHOUT, rmse);

    Ok(())
}
