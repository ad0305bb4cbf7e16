//! Neural Network inference.
//!
//! Networks are loaded from ONNX files and executed on the CPU by `tract`.

use std::{ops::RangeInclusive, path::Path};

use anyhow::{anyhow, bail, Context};
use tract_onnx::prelude::{
    tract_ndarray::Array4, tvec, Framework, Graph, InferenceModelExt, SimplePlan, TValue, TVec,
    Tensor, TypedFact, TypedOp,
};

use crate::image::Resolution;

type Model = SimplePlan<TypedFact, Box<dyn TypedOp>, Graph<TypedFact, Box<dyn TypedOp>>>;

/// A neural network that can be used for inference.
pub struct NeuralNetwork {
    inner: Model,
}

impl NeuralNetwork {
    /// Loads a pre-trained model from an ONNX file path.
    ///
    /// The path must have a `.onnx` extension.
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        Self::load_impl(path.as_ref())
    }

    fn load_impl(path: &Path) -> anyhow::Result<Self> {
        match path.extension() {
            Some(ext) if ext == "onnx" => {}
            _ => bail!(
                "neural network path '{}' must have `.onnx` extension",
                path.display()
            ),
        }

        let model_data = std::fs::read(path)
            .with_context(|| format!("failed to read model '{}'", path.display()))?;
        Self::from_onnx(&model_data)
    }

    /// Loads a pre-trained model from an in-memory ONNX file.
    pub fn from_onnx(raw: &[u8]) -> anyhow::Result<Self> {
        let graph = tract_onnx::onnx().model_for_read(&mut &*raw)?;
        let inner = graph.into_optimized()?.into_runnable()?;
        Ok(Self { inner })
    }

    /// Returns the number of input nodes of the network.
    pub fn num_inputs(&self) -> usize {
        self.inner.model().inputs.len()
    }

    /// Returns the number of output nodes of the network.
    pub fn num_outputs(&self) -> usize {
        self.inner.model().outputs.len()
    }

    /// Returns the concrete tensor shape of the input node with index `id`.
    pub fn input_shape(&self, id: usize) -> anyhow::Result<Vec<usize>> {
        let fact = self.inner.model().input_fact(id)?;
        let shape = fact
            .shape
            .as_concrete()
            .ok_or_else(|| anyhow!("network input {id} has a symbolic shape"))?;
        Ok(shape.to_vec())
    }

    /// Runs the network on a set of inputs, returning the estimated outputs.
    #[doc(alias = "infer")]
    pub fn estimate(&self, inputs: TVec<TValue>) -> anyhow::Result<Outputs> {
        let inner = self.inner.run(inputs)?;
        Ok(Outputs { inner })
    }
}

/// Describes in what order a CNN expects its input image data.
///
/// - `N` is the number of images, fixed at 1.
/// - `C` is the number of color channels, 3 for RGB inputs.
/// - `H` and `W` are the height and width of the input, respectively.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CnnInputShape {
    /// Shape is `(N, C, H, W)`.
    NCHW,
    /// Shape is `(N, H, W, C)`.
    NHWC,
}

/// A convolutional neural network (CNN) that operates on RGB image data.
pub struct Cnn {
    nn: NeuralNetwork,
    shape: CnnInputShape,
    input_res: Resolution,
    color_range: RangeInclusive<f32>,
}

impl Cnn {
    /// Creates a CNN wrapper from a [`NeuralNetwork`].
    ///
    /// The network must have exactly one input with a shape that matches `shape`. Color values
    /// are mapped linearly from `0..=255` to `color_range`.
    pub fn new(
        nn: NeuralNetwork,
        shape: CnnInputShape,
        color_range: RangeInclusive<f32>,
    ) -> anyhow::Result<Self> {
        if nn.num_inputs() != 1 {
            bail!(
                "CNN network has to take 1 input, this one takes {}",
                nn.num_inputs()
            );
        }

        let tensor_shape = nn.input_shape(0)?;
        let (w, h) = match (shape, &*tensor_shape) {
            (CnnInputShape::NCHW, [1, 3, h, w]) | (CnnInputShape::NHWC, [1, h, w, 3]) => (*w, *h),
            _ => bail!(
                "invalid model input shape for {:?} CNN: {:?}",
                shape,
                tensor_shape
            ),
        };
        let input_res = Resolution::new(w.try_into()?, h.try_into()?);

        Ok(Self {
            nn,
            shape,
            input_res,
            color_range,
        })
    }

    /// Returns the expected input image size.
    #[inline]
    pub fn input_resolution(&self) -> Resolution {
        self.input_res
    }

    /// Runs the network, obtaining the color of each input pixel `(x, y)` from `sample`.
    ///
    /// This allows feeding scaled, letterboxed or rotated regions of a frame to the network without
    /// materializing the intermediate image.
    pub fn estimate<F>(&self, sample: F) -> anyhow::Result<Outputs>
    where
        F: Fn(u32, u32) -> [u8; 3],
    {
        let tensor = input_tensor(self.shape, self.input_res, &self.color_range, sample);
        self.nn.estimate(tvec![tensor.into()])
    }
}

fn input_tensor<F>(
    shape: CnnInputShape,
    res: Resolution,
    range: &RangeInclusive<f32>,
    sample: F,
) -> Tensor
where
    F: Fn(u32, u32) -> [u8; 3],
{
    let (h, w) = (res.height() as usize, res.width() as usize);
    let (min, max) = (*range.start(), *range.end());
    let map = |value: u8| min + (value as f32 / 255.0) * (max - min);

    let array = match shape {
        CnnInputShape::NCHW => Array4::from_shape_fn((1, 3, h, w), |(_, c, y, x)| {
            map(sample(x as u32, y as u32)[c])
        }),
        CnnInputShape::NHWC => Array4::from_shape_fn((1, h, w, 3), |(_, y, x, c)| {
            map(sample(x as u32, y as u32)[c])
        }),
    };
    Tensor::from(array)
}

/// The result of a neural network inference pass.
///
/// This is a list of tensors corresponding to the network's output nodes.
#[derive(Debug)]
pub struct Outputs {
    inner: TVec<TValue>,
}

impl Outputs {
    /// Returns the number of tensors in this inference output.
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// Returns the shape of output tensor `index`.
    pub fn shape(&self, index: usize) -> anyhow::Result<&[usize]> {
        Ok(self.tensor(index)?.shape())
    }

    /// Returns the `f32` contents of output tensor `index`, in row-major order.
    pub fn slice(&self, index: usize) -> anyhow::Result<&[f32]> {
        Ok(self.tensor(index)?.as_slice::<f32>()?)
    }

    fn tensor(&self, index: usize) -> anyhow::Result<&Tensor> {
        match self.inner.get(index) {
            Some(value) => Ok(&**value),
            None => bail!(
                "network output {index} requested, but only {} outputs exist",
                self.inner.len()
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn input_layout() {
        let res = Resolution::new(3, 2);
        let sample = |x: u32, y: u32| [(x * 10) as u8, (y * 10) as u8, 255];

        let nchw = input_tensor(CnnInputShape::NCHW, res, &(0.0..=1.0), sample);
        assert_eq!(nchw.shape(), &[1, 3, 2, 3]);
        let data = nchw.as_slice::<f32>().unwrap();
        // red channel plane first, row by row
        assert_eq!(data[2], 20.0 / 255.0);
        // green plane, second row
        assert_eq!(data[6 + 3], 10.0 / 255.0);
        assert_eq!(data[12], 1.0);

        let nhwc = input_tensor(CnnInputShape::NHWC, res, &(-1.0..=1.0), sample);
        assert_eq!(nhwc.shape(), &[1, 2, 3, 3]);
        let data = nhwc.as_slice::<f32>().unwrap();
        assert_eq!(data[0], -1.0);
        assert_eq!(data[2], 1.0);
    }

    #[test]
    fn load_requires_onnx_extension() {
        let err = NeuralNetwork::load("model.tflite").err().unwrap();
        assert!(err.to_string().contains(".onnx"), "{err}");
    }
}
