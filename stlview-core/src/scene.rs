//! Actors owned by the viewport and the reverse lookup to their files

use std::collections::HashMap;
use std::sync::Arc;

use crate::color::Rgb;
use crate::geometry::{Aabb, Mesh};
use crate::representation::Representation;

/// Identity of an actor, unique for the lifetime of a scene
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ActorId(u64);

impl ActorId {
    pub fn raw(self) -> u64 {
        self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ActorStyle {
    pub representation: Representation,
    pub color: Rgb,
}

/// A renderable mesh plus its style
#[derive(Debug, Clone)]
pub struct Actor {
    id: ActorId,
    mesh: Arc<Mesh>,
    style: ActorStyle,
    bounds: Option<Aabb>,
}

impl Actor {
    pub fn id(&self) -> ActorId {
        self.id
    }

    pub fn mesh(&self) -> &Mesh {
        &self.mesh
    }

    pub fn style(&self) -> ActorStyle {
        self.style
    }

    pub fn bounds(&self) -> Option<Aabb> {
        self.bounds
    }
}

#[derive(Debug, Default)]
pub struct Scene {
    actors: Vec<Actor>,
    next_id: u64,
}

impl Scene {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_actor(&mut self, mesh: Arc<Mesh>, style: ActorStyle) -> ActorId {
        let id = ActorId(self.next_id);
        self.next_id += 1;
        let bounds = mesh.bounds();
        self.actors.push(Actor {
            id,
            mesh,
            style,
            bounds,
        });
        id
    }

    /// Remove and drop every actor, returning how many were released
    pub fn clear(&mut self) -> usize {
        let released = self.actors.len();
        self.actors.clear();
        released
    }

    pub fn actors(&self) -> &[Actor] {
        &self.actors
    }

    pub fn actor(&self, id: ActorId) -> Option<&Actor> {
        self.actors.iter().find(|a| a.id == id)
    }

    pub fn len(&self) -> usize {
        self.actors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actors.is_empty()
    }

    /// Union of all actor bounds
    pub fn bounds(&self) -> Option<Aabb> {
        self.actors
            .iter()
            .filter_map(|a| a.bounds)
            .reduce(|acc, b| acc.union(&b))
    }
}

/// Actor to originating file name, consulted by picking
#[derive(Debug, Default, Clone)]
pub struct ActorLookup {
    files: HashMap<ActorId, String>,
}

impl ActorLookup {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, id: ActorId, file_name: &str) {
        self.files.insert(id, file_name.to_string());
    }

    pub fn file_name(&self, id: ActorId) -> Option<&str> {
        self.files.get(&id).map(String::as_str)
    }

    pub fn clear(&mut self) {
        self.files.clear();
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// True when the key set is exactly the scene's actor set
    pub fn matches(&self, scene: &Scene) -> bool {
        self.files.len() == scene.len()
            && scene.actors().iter().all(|a| self.files.contains_key(&a.id()))
    }
}
