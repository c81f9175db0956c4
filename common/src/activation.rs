/// The nonlinearity applied elementwise to the pre-activation of a reservoir
#[derive(Debug, Clone, Copy)]
pub enum Activation {
    /// The identity function
    Identity,
    /// The hyperbolic tangent
    Tanh,
    /// The rectified linear unit
    Relu,
    /// The logistic function
    Sigmoid,
    /// Any user supplied function
    Custom(fn(f64) -> f64),
}

impl Default for Activation {
    fn default() -> Self {
        Activation::Tanh
    }
}

impl Activation {
    /// Perform the activation function over all elements
    pub fn activate(&self, vals: &mut [f64]) {
        match self {
            Activation::Identity => {}
            Activation::Tanh => {
                for v in vals {
                    *v = v.tanh();
                }
            }
            Activation::Relu => {
                for v in vals {
                    if *v < 0.0 {
                        *v = 0.0;
                    }
                }
            }
            Activation::Sigmoid => {
                for v in vals {
                    *v = 1.0 / (1.0 + (-*v).exp());
                }
            }
            Activation::Custom(f) => {
                for v in vals {
                    *v = f(*v);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use round::round;

    use super::*;

    #[test]
    fn activations() {
        let inputs = [-2.0, -0.5, 0.0, 0.5, 2.0];

        let mut vals = inputs;
        Activation::Identity.activate(&mut vals);
        assert_eq!(vals, inputs);

        let mut vals = inputs;
        Activation::Relu.activate(&mut vals);
        assert_eq!(vals, [0.0, 0.0, 0.0, 0.5, 2.0]);

        let mut vals = inputs;
        Activation::Tanh.activate(&mut vals);
        vals.iter_mut().for_each(|v| *v = round(*v, 4));
        assert_eq!(vals, [-0.964, -0.4621, 0.0, 0.4621, 0.964]);

        let mut vals = inputs;
        Activation::Sigmoid.activate(&mut vals);
        vals.iter_mut().for_each(|v| *v = round(*v, 4));
        assert_eq!(vals, [0.1192, 0.3775, 0.5, 0.6225, 0.8808]);
    }

    #[test]
    fn custom_activation() {
        fn square(v: f64) -> f64 {
            v * v
        }
        let mut vals = [-2.0, 3.0];
        Activation::Custom(square).activate(&mut vals);
        assert_eq!(vals, [4.0, 9.0]);
    }
}
