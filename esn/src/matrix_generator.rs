use std::{cell::RefCell, fmt, rc::Rc};

use nalgebra::DMatrix;

/// The shape of a matrix requested from a generator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shape {
    /// A column vector of the given length, as used for the reservoir biases
    Vector(usize),
    /// A (rows, cols) matrix
    Matrix(usize, usize),
}

impl Shape {
    /// (rows, cols) of the generated matrix
    #[inline(always)]
    pub fn dims(&self) -> (usize, usize) {
        match *self {
            Shape::Vector(len) => (len, 1),
            Shape::Matrix(rows, cols) => (rows, cols),
        }
    }
}

/// Provides the abstraction needed for custom implementations of the weight generation process.
/// The generator alone is responsible for producing the requested shape and for its own
/// randomness and seeding.
pub trait MatrixGenerator {
    /// Produce a matrix of the given shape
    fn generate(&mut self, shape: Shape) -> DMatrix<f64>;
}

/// Lets several weight slots draw from one generator, and thus from one seeded stream
#[derive(Debug)]
pub struct SharedGenerator<G>(Rc<RefCell<G>>);

impl<G> SharedGenerator<G> {
    pub fn new(generator: G) -> Self {
        Self(Rc::new(RefCell::new(generator)))
    }
}

impl<G> Clone for SharedGenerator<G> {
    fn clone(&self) -> Self {
        Self(Rc::clone(&self.0))
    }
}

impl<G: MatrixGenerator> MatrixGenerator for SharedGenerator<G> {
    fn generate(&mut self, shape: Shape) -> DMatrix<f64> {
        self.0.borrow_mut().generate(shape)
    }
}

/// Where the weights of one reservoir slot come from.
/// Resolved exactly once, when the network is constructed.
pub enum WeightSource {
    /// A stateful generator
    Generator(Box<dyn MatrixGenerator>),
    /// A plain function of the requested shape
    Function(Box<dyn FnMut(Shape) -> DMatrix<f64>>),
    /// An already materialized matrix, used as is
    Matrix(DMatrix<f64>),
}

impl WeightSource {
    pub fn generator<G: MatrixGenerator + 'static>(generator: G) -> Self {
        WeightSource::Generator(Box::new(generator))
    }

    pub fn function<F: FnMut(Shape) -> DMatrix<f64> + 'static>(f: F) -> Self {
        WeightSource::Function(Box::new(f))
    }

    /// Turn the source into a concrete matrix.
    /// No shape check happens here, a literal matrix of the wrong shape is rejected by the
    /// reservoir that receives it.
    pub fn resolve(self, shape: Shape) -> DMatrix<f64> {
        match self {
            WeightSource::Generator(mut g) => g.generate(shape),
            WeightSource::Function(mut f) => f(shape),
            WeightSource::Matrix(m) => m,
        }
    }
}

impl From<DMatrix<f64>> for WeightSource {
    fn from(m: DMatrix<f64>) -> Self {
        WeightSource::Matrix(m)
    }
}

impl fmt::Debug for WeightSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WeightSource::Generator(_) => write!(f, "WeightSource::Generator"),
            WeightSource::Function(_) => write!(f, "WeightSource::Function"),
            WeightSource::Matrix(m) => {
                write!(f, "WeightSource::Matrix({}x{})", m.nrows(), m.ncols())
            }
        }
    }
}
