// src/material.rs
// Named shader parameter store with technique capability queries
// RELEVANT FILES: src/pipeline.rs, src/backend.rs

use std::collections::HashMap;

use glam::{Mat4, Vec4};

use crate::backend::TextureHandle;

/// Typed shader parameter payload.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MatParam {
    Float(f32),
    Int(i32),
    Bool(bool),
    Vec4(Vec4),
    Mat4(Mat4),
    Texture(TextureHandle),
}

/// Material as the pipeline sees it: a bag of named parameters plus the
/// set of techniques its shader definition supports. The embedding
/// renderer translates parameters into actual bindings.
#[derive(Debug, Clone)]
pub struct Material {
    name: String,
    techniques: Vec<String>,
    params: HashMap<String, MatParam>,
}

impl Material {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            techniques: Vec::new(),
            params: HashMap::new(),
        }
    }

    pub fn with_technique(mut self, technique: impl Into<String>) -> Self {
        self.techniques.push(technique.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Capability query used to decide between per-material parameter
    /// injection and the shared fallback material.
    pub fn supports_technique(&self, technique: &str) -> bool {
        self.techniques.iter().any(|t| t == technique)
    }

    pub fn param(&self, name: &str) -> Option<&MatParam> {
        self.params.get(name)
    }

    pub fn set_float(&mut self, name: impl Into<String>, value: f32) {
        self.params.insert(name.into(), MatParam::Float(value));
    }

    pub fn set_int(&mut self, name: impl Into<String>, value: i32) {
        self.params.insert(name.into(), MatParam::Int(value));
    }

    pub fn set_bool(&mut self, name: impl Into<String>, value: bool) {
        self.params.insert(name.into(), MatParam::Bool(value));
    }

    pub fn set_vec4(&mut self, name: impl Into<String>, value: Vec4) {
        self.params.insert(name.into(), MatParam::Vec4(value));
    }

    pub fn set_mat4(&mut self, name: impl Into<String>, value: Mat4) {
        self.params.insert(name.into(), MatParam::Mat4(value));
    }

    pub fn set_texture(&mut self, name: impl Into<String>, value: TextureHandle) {
        self.params.insert(name.into(), MatParam::Texture(value));
    }

    pub fn param_count(&self) -> usize {
        self.params.len()
    }
}
