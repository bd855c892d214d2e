//! TorchScript backend

use crate::CutPredictor;
use cutmark_core::{Error, Point3f, Result};
use std::path::Path;
use tch::{CModule, Device, Kind, Tensor};

/// A scripted point segmentation network mapping `[B, N, 3]` to `[B, N]` scores
pub struct TorchCutModel {
    module: CModule,
    device: Device,
}

impl TorchCutModel {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let device = Device::cuda_if_available();
        let mut module = CModule::load_on_device(path, device)
            .map_err(|e| Error::Inference(format!("cannot load {}: {}", path.display(), e)))?;
        module.set_eval();
        log::info!("loaded {} on {:?}", path.display(), device);
        Ok(Self { module, device })
    }

    pub fn device(&self) -> Device {
        self.device
    }
}

impl CutPredictor for TorchCutModel {
    fn predict(&self, batch: &[&[Point3f]]) -> Result<Vec<Vec<f32>>> {
        let Some(first) = batch.first() else {
            return Ok(Vec::new());
        };
        let b = batch.len();
        let n = first.len();
        if n == 0 {
            return Ok(vec![Vec::new(); b]);
        }

        let mut flat: Vec<f32> = Vec::with_capacity(b * n * 3);
        for cloud in batch {
            flat.extend_from_slice(bytemuck::cast_slice::<Point3f, f32>(cloud));
        }

        let scores = tch::no_grad(|| -> std::result::Result<Tensor, tch::TchError> {
            let input = Tensor::from_slice(&flat)
                .reshape([b as i64, n as i64, 3])
                .to_device(self.device);
            let output = self.module.forward_ts(&[input])?;
            Ok(output.to_kind(Kind::Float).to_device(Device::Cpu).reshape([-1]))
        })
        .map_err(|e| Error::Inference(e.to_string()))?;

        let values = Vec::<f32>::try_from(&scores).map_err(|e| Error::Inference(e.to_string()))?;
        if values.len() != b * n {
            return Err(Error::Inference(format!(
                "model returned {} values for a [{}, {}] batch",
                values.len(),
                b,
                n
            )));
        }
        Ok(values.chunks(n).map(<[f32]>::to_vec).collect())
    }
}
