//! Reference model backend: a contextual autoencoder over minibatch
//! SGD.
//!
//! Three input branches (context agents, map, context stats) project
//! into a shared trunk that narrows to a named latent layer and widens
//! back out to two heads: agent softmax (cross-entropy) and stat
//! linear (mean squared error). Dropout applies to the trunk layers
//! during training only. Weights persist as safetensors with a
//! meta.json sidecar.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use bytemuck::cast_slice;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use safetensors::tensor::{Dtype, TensorView};
use safetensors::SafeTensors;
use serde::{Deserialize, Serialize};
use vp_data::{Array2, LeaveOneOutDataset};

use crate::hparams::{get_int, get_real, get_text, HpConfig, HpSpec};
use crate::model::{EpochLogs, ModelError, ModelFactory, ModelShapes, TrainableModel};

/// Bump when the saved weight layout changes.
pub const MODEL_SCHEMA_VERSION: u32 = 1;

/// Fully connected layer, weights `[in, out]` row-major.
#[derive(Debug, Clone)]
struct Dense {
    w: Vec<f32>,
    b: Vec<f32>,
    gw: Vec<f32>,
    gb: Vec<f32>,
    in_dim: usize,
    out_dim: usize,
}

impl Dense {
    fn new(in_dim: usize, out_dim: usize, rng: &mut ChaCha8Rng) -> Self {
        // Glorot uniform.
        let limit = (6.0 / (in_dim + out_dim) as f32).sqrt();
        let w = (0..in_dim * out_dim)
            .map(|_| rng.gen_range(-limit..limit))
            .collect();
        Self {
            w,
            b: vec![0.0; out_dim],
            gw: vec![0.0; in_dim * out_dim],
            gb: vec![0.0; out_dim],
            in_dim,
            out_dim,
        }
    }

    fn from_parts(w: Vec<f32>, b: Vec<f32>, in_dim: usize, out_dim: usize) -> Result<Self, ModelError> {
        if w.len() != in_dim * out_dim || b.len() != out_dim {
            return Err(ModelError::Shape(format!(
                "dense [{in_dim}, {out_dim}]: got {} weights, {} biases",
                w.len(),
                b.len()
            )));
        }
        Ok(Self {
            gw: vec![0.0; w.len()],
            gb: vec![0.0; b.len()],
            w,
            b,
            in_dim,
            out_dim,
        })
    }

    fn forward(&self, x: &[f32]) -> Vec<f32> {
        debug_assert_eq!(x.len(), self.in_dim);
        let mut y = self.b.clone();
        for (k, &xv) in x.iter().enumerate() {
            if xv == 0.0 {
                continue;
            }
            let row = &self.w[k * self.out_dim..(k + 1) * self.out_dim];
            for (yv, &wv) in y.iter_mut().zip(row) {
                *yv += xv * wv;
            }
        }
        y
    }

    /// Accumulate gradients for one example and return dL/dx.
    fn backward(&mut self, x: &[f32], dy: &[f32]) -> Vec<f32> {
        debug_assert_eq!(x.len(), self.in_dim);
        debug_assert_eq!(dy.len(), self.out_dim);
        let mut dx = vec![0.0f32; self.in_dim];
        for (k, &xv) in x.iter().enumerate() {
            let row = &self.w[k * self.out_dim..(k + 1) * self.out_dim];
            let grow = &mut self.gw[k * self.out_dim..(k + 1) * self.out_dim];
            let mut acc = 0.0f32;
            for ((&wv, gv), &dv) in row.iter().zip(grow.iter_mut()).zip(dy) {
                acc += wv * dv;
                *gv += xv * dv;
            }
            dx[k] = acc;
        }
        for (g, &dv) in self.gb.iter_mut().zip(dy) {
            *g += dv;
        }
        dx
    }

    fn zero_grads(&mut self) {
        self.gw.fill(0.0);
        self.gb.fill(0.0);
    }

    /// SGD step with averaged gradients.
    fn step(&mut self, lr: f32, scale: f32) {
        for (w, g) in self.w.iter_mut().zip(&self.gw) {
            *w -= lr * scale * g;
        }
        for (b, g) in self.b.iter_mut().zip(&self.gb) {
            *b -= lr * scale * g;
        }
    }
}

fn relu_inplace(v: &mut [f32]) {
    for x in v {
        if *x < 0.0 {
            *x = 0.0;
        }
    }
}

/// Zero upstream gradient where the post-ReLU activation was clamped.
fn relu_backward(dy: &mut [f32], post: &[f32]) {
    for (d, &y) in dy.iter_mut().zip(post) {
        if y <= 0.0 {
            *d = 0.0;
        }
    }
}

fn softmax_inplace(v: &mut [f32]) {
    let mut max = f32::NEG_INFINITY;
    for &x in v.iter() {
        if x > max {
            max = x;
        }
    }
    let mut sum = 0.0f32;
    for x in v.iter_mut() {
        *x = (*x - max).exp();
        sum += *x;
    }
    let inv = 1.0 / sum.max(1e-12);
    for x in v.iter_mut() {
        *x *= inv;
    }
}

fn argmax(v: &[f32]) -> usize {
    let mut best = 0usize;
    for (i, &x) in v.iter().enumerate() {
        if x > v[best] {
            best = i;
        }
    }
    best
}

/// Forward activations kept for the backward pass.
struct Trace {
    ha: Vec<f32>,
    hm: Vec<f32>,
    hs: Vec<f32>,
    z0: Vec<f32>,
    a1: Vec<f32>,
    d1: Vec<f32>,
    a2: Vec<f32>,
    d2: Vec<f32>,
    lat: Vec<f32>,
    a3: Vec<f32>,
    d3: Vec<f32>,
    a4: Vec<f32>,
    d4: Vec<f32>,
    head_a: Vec<f32>,
    probs: Vec<f32>,
    head_s: Vec<f32>,
    stat: Vec<f32>,
}

type DropMasks = [Vec<f32>; 4];

/// Persisted alongside the weights so the inference path can rebuild
/// the exact architecture.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelMeta {
    pub schema_version: u32,
    pub context_agents: usize,
    pub agent_vocab: usize,
    pub map_vocab: usize,
    pub stat_dim: usize,
    pub latent_dim: usize,
    pub learning_rate: f64,
    pub config: HpConfig,
}

pub struct ContextualModel {
    shapes: ModelShapes,
    config: HpConfig,
    lr: f64,
    dropout: f32,
    batch_size: usize,
    rng: ChaCha8Rng,

    agents_in: Dense,
    maps_in: Dense,
    stats_in: Dense,
    enc_a: Dense,
    enc_b: Dense,
    latent: Dense,
    dec_b: Dense,
    dec_a: Dense,
    agent_head: Dense,
    agent_out: Dense,
    stat_head: Dense,
    stat_out: Dense,
}

impl ContextualModel {
    pub fn new(
        config: &HpConfig,
        agent_vocab: usize,
        map_vocab: usize,
        stat_dim: usize,
        batch_size: usize,
        seed: u64,
    ) -> Result<Self, ModelError> {
        let p = positive(config, "input_processing_size")?;
        let layer_a = positive(config, "layer_a_size")?;
        let layer_b = positive(config, "layer_b_size")?;
        let latent_dim = positive(config, "latent_size")?;
        let out_p = positive(config, "output_processing_size")?;

        let dropout = get_real(config, "dropout")? as f32;
        if !(0.0..1.0).contains(&dropout) {
            return Err(ModelError::BadHyperparameter {
                name: "dropout".to_string(),
                reason: format!("{dropout} outside [0, 1)"),
            });
        }
        let lr = match config.get("learning_rate") {
            Some(_) => get_real(config, "learning_rate")?,
            None => 1e-3,
        };
        if config.get("activation").is_some() {
            let act = get_text(config, "activation")?;
            if act != "relu" {
                return Err(ModelError::BadHyperparameter {
                    name: "activation".to_string(),
                    reason: format!("unsupported activation {act:?}"),
                });
            }
        }
        if agent_vocab == 0 || map_vocab == 0 || stat_dim == 0 {
            return Err(ModelError::Shape(
                "vocab and stat dimensions must be non-zero".to_string(),
            ));
        }

        let shapes = ModelShapes {
            context_agents: vp_core::CONTEXT_SIZE,
            agent_vocab,
            map_vocab,
            stat_dim,
            latent_dim,
        };
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let ctx = shapes.context_agents;
        Ok(Self {
            agents_in: Dense::new(ctx * agent_vocab, p, &mut rng),
            maps_in: Dense::new(map_vocab, p, &mut rng),
            stats_in: Dense::new(ctx * stat_dim, p, &mut rng),
            enc_a: Dense::new(3 * p, layer_a, &mut rng),
            enc_b: Dense::new(layer_a, layer_b, &mut rng),
            latent: Dense::new(layer_b, latent_dim, &mut rng),
            dec_b: Dense::new(latent_dim, layer_b, &mut rng),
            dec_a: Dense::new(layer_b, layer_a, &mut rng),
            agent_head: Dense::new(layer_a, out_p, &mut rng),
            agent_out: Dense::new(out_p, agent_vocab, &mut rng),
            stat_head: Dense::new(layer_a, out_p, &mut rng),
            stat_out: Dense::new(out_p, stat_dim, &mut rng),
            shapes,
            config: config.clone(),
            lr,
            dropout,
            batch_size: batch_size.max(1),
            rng,
        })
    }

    fn check_dataset(&self, ds: &LeaveOneOutDataset) -> Result<(), ModelError> {
        let s = self.shapes;
        if ds.agent_dim() != s.agent_vocab
            || ds.map_dim() != s.map_vocab
            || ds.stat_dim() != s.stat_dim
            || ds.x_agents.rows() != s.context_agents
        {
            return Err(ModelError::Shape(format!(
                "dataset dims (A={}, M={}, S={}, ctx={}) != model dims (A={}, M={}, S={}, ctx={})",
                ds.agent_dim(),
                ds.map_dim(),
                ds.stat_dim(),
                ds.x_agents.rows(),
                s.agent_vocab,
                s.map_vocab,
                s.stat_dim,
                s.context_agents
            )));
        }
        Ok(())
    }

    fn make_masks(&mut self, dims: [usize; 4]) -> Option<DropMasks> {
        if self.dropout == 0.0 {
            return None;
        }
        let keep = 1.0 - self.dropout;
        let inv = 1.0 / keep;
        Some(dims.map(|d| {
            (0..d)
                .map(|_| if self.rng.gen::<f32>() < keep { inv } else { 0.0 })
                .collect()
        }))
    }

    fn forward_with(
        &self,
        xa: &[f32],
        xm: &[f32],
        xs: &[f32],
        masks: Option<&DropMasks>,
    ) -> Trace {
        let apply = |v: &[f32], i: usize| -> Vec<f32> {
            match masks {
                Some(m) => v.iter().zip(&m[i]).map(|(a, b)| a * b).collect(),
                None => v.to_vec(),
            }
        };

        let mut ha = self.agents_in.forward(xa);
        relu_inplace(&mut ha);
        let mut hm = self.maps_in.forward(xm);
        relu_inplace(&mut hm);
        let mut hs = self.stats_in.forward(xs);
        relu_inplace(&mut hs);

        let mut z0 = Vec::with_capacity(ha.len() * 3);
        z0.extend_from_slice(&ha);
        z0.extend_from_slice(&hm);
        z0.extend_from_slice(&hs);

        let mut a1 = self.enc_a.forward(&z0);
        relu_inplace(&mut a1);
        let d1 = apply(&a1, 0);
        let mut a2 = self.enc_b.forward(&d1);
        relu_inplace(&mut a2);
        let d2 = apply(&a2, 1);
        let mut lat = self.latent.forward(&d2);
        relu_inplace(&mut lat);
        let mut a3 = self.dec_b.forward(&lat);
        relu_inplace(&mut a3);
        let d3 = apply(&a3, 2);
        let mut a4 = self.dec_a.forward(&d3);
        relu_inplace(&mut a4);
        let d4 = apply(&a4, 3);

        let mut head_a = self.agent_head.forward(&d4);
        relu_inplace(&mut head_a);
        let mut probs = self.agent_out.forward(&head_a);
        softmax_inplace(&mut probs);

        let head_s = self.stat_head.forward(&d4);
        let stat = self.stat_out.forward(&head_s);

        Trace {
            ha,
            hm,
            hs,
            z0,
            a1,
            d1,
            a2,
            d2,
            lat,
            a3,
            d3,
            a4,
            d4,
            head_a,
            probs,
            head_s,
            stat,
        }
    }

    fn backward(
        &mut self,
        t: &Trace,
        xa: &[f32],
        xm: &[f32],
        xs: &[f32],
        ya: &[f32],
        ys: &[f32],
        masks: Option<&DropMasks>,
    ) {
        let unmask = |mut d: Vec<f32>, i: usize| -> Vec<f32> {
            if let Some(m) = masks {
                for (v, k) in d.iter_mut().zip(&m[i]) {
                    *v *= k;
                }
            }
            d
        };

        // Softmax + cross-entropy collapse to probs - target.
        let d_logits: Vec<f32> = t.probs.iter().zip(ya).map(|(p, y)| p - y).collect();
        let mut d_head_a = self.agent_out.backward(&t.head_a, &d_logits);
        relu_backward(&mut d_head_a, &t.head_a);
        let d4_a = self.agent_head.backward(&t.d4, &d_head_a);

        let inv_s = 2.0 / ys.len() as f32;
        let d_stat: Vec<f32> = t.stat.iter().zip(ys).map(|(o, y)| inv_s * (o - y)).collect();
        let d_head_s = self.stat_out.backward(&t.head_s, &d_stat);
        let d4_s = self.stat_head.backward(&t.d4, &d_head_s);

        let d_d4: Vec<f32> = d4_a.iter().zip(&d4_s).map(|(a, b)| a + b).collect();
        let mut d_a4 = unmask(d_d4, 3);
        relu_backward(&mut d_a4, &t.a4);
        let d_d3 = self.dec_a.backward(&t.d3, &d_a4);
        let mut d_a3 = unmask(d_d3, 2);
        relu_backward(&mut d_a3, &t.a3);
        let mut d_lat = self.dec_b.backward(&t.lat, &d_a3);
        relu_backward(&mut d_lat, &t.lat);
        let d_d2 = self.latent.backward(&t.d2, &d_lat);
        let mut d_a2 = unmask(d_d2, 1);
        relu_backward(&mut d_a2, &t.a2);
        let d_d1 = self.enc_b.backward(&t.d1, &d_a2);
        let mut d_a1 = unmask(d_d1, 0);
        relu_backward(&mut d_a1, &t.a1);
        let d_z0 = self.enc_a.backward(&t.z0, &d_a1);

        let p = t.ha.len();
        let mut d_ha = d_z0[..p].to_vec();
        relu_backward(&mut d_ha, &t.ha);
        let _ = self.agents_in.backward(xa, &d_ha);
        let mut d_hm = d_z0[p..2 * p].to_vec();
        relu_backward(&mut d_hm, &t.hm);
        let _ = self.maps_in.backward(xm, &d_hm);
        let mut d_hs = d_z0[2 * p..].to_vec();
        relu_backward(&mut d_hs, &t.hs);
        let _ = self.stats_in.backward(xs, &d_hs);
    }

    fn example_metrics(t: &Trace, ya: &[f32], ys: &[f32]) -> (f64, f64, f64, bool) {
        let target = argmax(ya);
        let ce = -(t.probs[target].max(1e-12).ln()) as f64;
        let mse = t
            .stat
            .iter()
            .zip(ys)
            .map(|(o, y)| {
                let d = (o - y) as f64;
                d * d
            })
            .sum::<f64>()
            / ys.len() as f64;
        let hit = argmax(&t.probs) == target;
        (ce + mse, ce, mse, hit)
    }

    fn metrics_over(&self, ds: &LeaveOneOutDataset) -> EpochLogs {
        let mut loss = 0.0;
        let mut agent_loss = 0.0;
        let mut stat_loss = 0.0;
        let mut hits = 0usize;
        for i in 0..ds.len() {
            let t = self.forward_with(ds.x_agents.slab(i), ds.x_maps.row(i), ds.x_stats.slab(i), None);
            let (l, ce, mse, hit) = Self::example_metrics(&t, ds.y_agents.row(i), ds.y_stats.row(i));
            loss += l;
            agent_loss += ce;
            stat_loss += mse;
            if hit {
                hits += 1;
            }
        }
        let n = ds.len().max(1) as f64;
        let mut logs = BTreeMap::new();
        logs.insert("loss".to_string(), loss / n);
        logs.insert("agent_loss".to_string(), agent_loss / n);
        logs.insert("stat_loss".to_string(), stat_loss / n);
        logs.insert("agent_accuracy".to_string(), hits as f64 / n);
        logs
    }

    fn layers(&self) -> [(&'static str, &Dense); 12] {
        [
            ("agents_in", &self.agents_in),
            ("maps_in", &self.maps_in),
            ("stats_in", &self.stats_in),
            ("enc_a", &self.enc_a),
            ("enc_b", &self.enc_b),
            ("latent", &self.latent),
            ("dec_b", &self.dec_b),
            ("dec_a", &self.dec_a),
            ("agent_head", &self.agent_head),
            ("agent_out", &self.agent_out),
            ("stat_head", &self.stat_head),
            ("stat_out", &self.stat_out),
        ]
    }

    /// Load a saved model and its sidecar.
    pub fn load(path: &Path) -> Result<Self, ModelError> {
        let meta_path = path.with_extension("meta.json");
        let meta: ModelMeta = serde_json::from_slice(&fs::read(&meta_path)?)?;
        if meta.schema_version != MODEL_SCHEMA_VERSION {
            return Err(ModelError::Shape(format!(
                "unsupported model schema version {}",
                meta.schema_version
            )));
        }

        let mut model = Self::new(
            &meta.config,
            meta.agent_vocab,
            meta.map_vocab,
            meta.stat_dim,
            1,
            0,
        )?;
        model.lr = meta.learning_rate;

        let bytes = fs::read(path)?;
        let st = SafeTensors::deserialize(&bytes)?;
        let mut assign = |name: &str, layer: &mut Dense| -> Result<(), ModelError> {
            let wt = st
                .tensor(&format!("{name}.weight"))
                .map_err(ModelError::Safetensors)?;
            let bt = st
                .tensor(&format!("{name}.bias"))
                .map_err(ModelError::Safetensors)?;
            let w: Vec<f32> = bytemuck::pod_collect_to_vec(wt.data());
            let b: Vec<f32> = bytemuck::pod_collect_to_vec(bt.data());
            *layer = Dense::from_parts(w, b, layer.in_dim, layer.out_dim)?;
            Ok(())
        };
        assign("agents_in", &mut model.agents_in)?;
        assign("maps_in", &mut model.maps_in)?;
        assign("stats_in", &mut model.stats_in)?;
        assign("enc_a", &mut model.enc_a)?;
        assign("enc_b", &mut model.enc_b)?;
        assign("latent", &mut model.latent)?;
        assign("dec_b", &mut model.dec_b)?;
        assign("dec_a", &mut model.dec_a)?;
        assign("agent_head", &mut model.agent_head)?;
        assign("agent_out", &mut model.agent_out)?;
        assign("stat_head", &mut model.stat_head)?;
        assign("stat_out", &mut model.stat_out)?;
        Ok(model)
    }
}

impl TrainableModel for ContextualModel {
    fn shapes(&self) -> ModelShapes {
        self.shapes
    }

    fn learning_rate(&self) -> f64 {
        self.lr
    }

    fn set_learning_rate(&mut self, lr: f64) {
        self.lr = lr;
    }

    fn train_epoch(&mut self, train: &LeaveOneOutDataset) -> Result<EpochLogs, ModelError> {
        self.check_dataset(train)?;
        if train.is_empty() {
            return Err(ModelError::Step("empty training dataset".to_string()));
        }

        let mut order: Vec<usize> = (0..train.len()).collect();
        order.shuffle(&mut self.rng);

        let lr = self.lr as f32;
        let mask_dims = [
            self.enc_a.out_dim,
            self.enc_b.out_dim,
            self.dec_b.out_dim,
            self.dec_a.out_dim,
        ];

        let mut loss = 0.0;
        let mut agent_loss = 0.0;
        let mut stat_loss = 0.0;
        let mut hits = 0usize;

        for batch in order.chunks(self.batch_size) {
            for layer in [
                &mut self.agents_in,
                &mut self.maps_in,
                &mut self.stats_in,
                &mut self.enc_a,
                &mut self.enc_b,
                &mut self.latent,
                &mut self.dec_b,
                &mut self.dec_a,
                &mut self.agent_head,
                &mut self.agent_out,
                &mut self.stat_head,
                &mut self.stat_out,
            ] {
                layer.zero_grads();
            }

            for &i in batch {
                let masks = self.make_masks(mask_dims);
                let xa = train.x_agents.slab(i);
                let xm = train.x_maps.row(i);
                let xs = train.x_stats.slab(i);
                let ya = train.y_agents.row(i);
                let ys = train.y_stats.row(i);

                let t = self.forward_with(xa, xm, xs, masks.as_ref());
                let (l, ce, mse, hit) = Self::example_metrics(&t, ya, ys);
                loss += l;
                agent_loss += ce;
                stat_loss += mse;
                if hit {
                    hits += 1;
                }
                self.backward(&t, xa, xm, xs, ya, ys, masks.as_ref());
            }

            let scale = 1.0 / batch.len() as f32;
            for layer in [
                &mut self.agents_in,
                &mut self.maps_in,
                &mut self.stats_in,
                &mut self.enc_a,
                &mut self.enc_b,
                &mut self.latent,
                &mut self.dec_b,
                &mut self.dec_a,
                &mut self.agent_head,
                &mut self.agent_out,
                &mut self.stat_head,
                &mut self.stat_out,
            ] {
                layer.step(lr, scale);
            }
        }

        let n = train.len() as f64;
        let mut logs = BTreeMap::new();
        logs.insert("loss".to_string(), loss / n);
        logs.insert("agent_loss".to_string(), agent_loss / n);
        logs.insert("stat_loss".to_string(), stat_loss / n);
        logs.insert("agent_accuracy".to_string(), hits as f64 / n);
        Ok(logs)
    }

    fn evaluate(&self, data: &LeaveOneOutDataset) -> Result<EpochLogs, ModelError> {
        self.check_dataset(data)?;
        Ok(self.metrics_over(data))
    }

    fn save(&self, path: &Path) -> Result<(), ModelError> {
        let mut tensors: BTreeMap<String, TensorView<'_>> = BTreeMap::new();
        for (name, layer) in self.layers() {
            tensors.insert(
                format!("{name}.weight"),
                TensorView::new(
                    Dtype::F32,
                    vec![layer.in_dim, layer.out_dim],
                    cast_slice(&layer.w),
                )?,
            );
            tensors.insert(
                format!("{name}.bias"),
                TensorView::new(Dtype::F32, vec![layer.out_dim], cast_slice(&layer.b))?,
            );
        }

        let tmp = path.with_extension("safetensors.tmp");
        fs::write(&tmp, safetensors::serialize(&tensors, &None)?)?;
        fs::rename(&tmp, path)?;

        let meta = ModelMeta {
            schema_version: MODEL_SCHEMA_VERSION,
            context_agents: self.shapes.context_agents,
            agent_vocab: self.shapes.agent_vocab,
            map_vocab: self.shapes.map_vocab,
            stat_dim: self.shapes.stat_dim,
            latent_dim: self.shapes.latent_dim,
            learning_rate: self.lr,
            config: self.config.clone(),
        };
        let meta_path = path.with_extension("meta.json");
        let meta_tmp = path.with_extension("meta.json.tmp");
        fs::write(&meta_tmp, serde_json::to_vec_pretty(&meta)?)?;
        fs::rename(&meta_tmp, &meta_path)?;
        Ok(())
    }

    fn latent(&self, data: &LeaveOneOutDataset) -> Result<Array2, ModelError> {
        self.check_dataset(data)?;
        let mut out = Array2::zeros(data.len(), self.shapes.latent_dim);
        for i in 0..data.len() {
            let t = self.forward_with(
                data.x_agents.slab(i),
                data.x_maps.row(i),
                data.x_stats.slab(i),
                None,
            );
            out.row_mut(i).copy_from_slice(&t.lat);
        }
        Ok(out)
    }
}

fn positive(config: &HpConfig, name: &str) -> Result<usize, ModelError> {
    let v = get_int(config, name)?;
    if v <= 0 {
        return Err(ModelError::BadHyperparameter {
            name: name.to_string(),
            reason: format!("{v} must be > 0"),
        });
    }
    Ok(v as usize)
}

/// Factory for the reference backend, bound to the fitted encoding
/// widths.
#[derive(Debug, Clone)]
pub struct ContextualFactory {
    pub agent_vocab: usize,
    pub map_vocab: usize,
    pub stat_dim: usize,
    pub batch_size: usize,
    pub seed: u64,
}

impl ModelFactory for ContextualFactory {
    fn build(&self, config: &HpConfig) -> Result<Box<dyn TrainableModel>, ModelError> {
        Ok(Box::new(ContextualModel::new(
            config,
            self.agent_vocab,
            self.map_vocab,
            self.stat_dim,
            self.batch_size,
            self.seed,
        )?))
    }
}

/// The search space the reference runs use.
pub fn reference_search_space(latent_size: i64) -> Vec<HpSpec> {
    vec![
        HpSpec::discrete_ints("input_processing_size", [16, 32, 64]),
        HpSpec::discrete_ints("output_processing_size", [16, 32, 64]),
        HpSpec::discrete_ints("layer_a_size", [128, 192, 256]),
        HpSpec::discrete_ints("layer_b_size", [32, 64, 128]),
        HpSpec::discrete_ints("latent_size", [latent_size]),
        HpSpec::real_range("dropout", 0.1, 0.33),
        HpSpec::real_range("learning_rate", 1e-4, 1e-2),
        HpSpec::discrete_texts("activation", ["relu"]),
    ]
}
