use std::collections::HashMap;
use std::f32::consts::{PI, TAU};

use eframe::egui::{Pos2, Vec2, vec2};
use indexmap::IndexMap;

use crate::input::Document;
use crate::util::stable_pair;

use super::Surface;
use super::collision::BoundingBox;

const TOKEN_JITTER: f32 = 12.0;

/// Index of a node inside [`CloudGraph::nodes`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeKey(pub usize);

#[derive(Clone, Debug, PartialEq)]
pub struct DocumentNode {
    pub id: String,
    pub name: String,
    pub center: Pos2,
}

#[derive(Clone, Debug, PartialEq)]
pub struct TokenNode {
    pub token: String,
    pub position: Pos2,
    pub velocity: Vec2,
    pub bounding_box: Option<BoundingBox>,
}

impl TokenNode {
    /// Moves the node and keeps its measured box attached to it.
    pub fn move_by(&mut self, delta: Vec2) {
        self.position += delta;
        if let Some(bounding_box) = self.bounding_box.as_mut() {
            *bounding_box = bounding_box.translate(delta);
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum Node {
    /// Pinned anchor for one input document.
    Document(DocumentNode),
    Token(TokenNode),
}

impl Node {
    pub fn position(&self) -> Pos2 {
        match self {
            Self::Document(document) => document.center,
            Self::Token(token) => token.position,
        }
    }

    pub fn label(&self) -> &str {
        match self {
            Self::Document(document) => &document.name,
            Self::Token(token) => &token.token,
        }
    }

    pub fn is_fixed(&self) -> bool {
        matches!(self, Self::Document(_))
    }

    pub fn bounding_box(&self) -> Option<BoundingBox> {
        match self {
            Self::Document(_) => None,
            Self::Token(token) => token.bounding_box,
        }
    }

    pub fn as_token(&self) -> Option<&TokenNode> {
        match self {
            Self::Token(token) => Some(token),
            Self::Document(_) => None,
        }
    }

    pub fn as_token_mut(&mut self) -> Option<&mut TokenNode> {
        match self {
            Self::Token(token) => Some(token),
            Self::Document(_) => None,
        }
    }
}

/// Document → token link weighted by the token's score in that document.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Edge {
    pub source: NodeKey,
    pub target: NodeKey,
    pub weight: f32,
}

/// Summed score per token across the corpus, in first-seen order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CorpusFrequency(IndexMap<String, f32>);

impl CorpusFrequency {
    pub fn get(&self, token: &str) -> Option<f32> {
        self.0.get(token).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f32)> {
        self.0.iter().map(|(token, value)| (token.as_str(), *value))
    }

    pub fn values(&self) -> impl Iterator<Item = f32> + '_ {
        self.0.values().copied()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[derive(Clone, Debug)]
pub struct CloudGraph {
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
    pub frequency: CorpusFrequency,
    token_index: HashMap<String, NodeKey>,
    document_count: usize,
}

/// Anchor positions for `count` documents: the canvas centre for a single
/// document, otherwise evenly spaced on a ring starting at 180°.
pub fn document_centers(count: usize, surface: Surface, radius_fraction: f32) -> Vec<Pos2> {
    let center = surface.center();
    match count {
        0 => Vec::new(),
        1 => vec![center],
        _ => {
            let radius = surface.width * radius_fraction;
            let interval = TAU / count as f32;
            (0..count)
                .map(|index| {
                    let angle = PI + interval * index as f32;
                    center + vec2(angle.cos(), angle.sin()) * radius
                })
                .collect()
        }
    }
}

impl CloudGraph {
    pub fn build(documents: &[Document], surface: Surface, radius_fraction: f32) -> Self {
        let centers = document_centers(documents.len(), surface, radius_fraction);

        let scores_by_document = documents
            .iter()
            .map(|document| {
                let mut scores = IndexMap::with_capacity(document.tokens.len());
                for (token, score) in &document.tokens {
                    scores.insert(token.as_str(), *score);
                }
                scores
            })
            .collect::<Vec<_>>();

        let mut frequency = IndexMap::<String, f32>::new();
        let mut first_document = Vec::new();
        for (document_index, scores) in scores_by_document.iter().enumerate() {
            for (&token, &score) in scores {
                if let Some(sum) = frequency.get_mut(token) {
                    *sum += score;
                } else {
                    frequency.insert(token.to_owned(), score);
                    first_document.push(document_index);
                }
            }
        }

        let mut nodes = Vec::with_capacity(documents.len() + frequency.len());
        for (document, center) in documents.iter().zip(centers.iter()) {
            nodes.push(Node::Document(DocumentNode {
                id: document.id.clone(),
                name: document.name.clone(),
                center: *center,
            }));
        }

        let mut token_index = HashMap::with_capacity(frequency.len());
        for (token, &document_index) in frequency.keys().zip(first_document.iter()) {
            let (jx, jy) = stable_pair(token);
            let key = NodeKey(nodes.len());
            nodes.push(Node::Token(TokenNode {
                token: token.clone(),
                position: centers[document_index] + vec2(jx, jy) * TOKEN_JITTER,
                velocity: Vec2::ZERO,
                bounding_box: None,
            }));
            token_index.insert(token.clone(), key);
        }

        let mut edges = Vec::new();
        for (document_index, scores) in scores_by_document.iter().enumerate() {
            for (&token, &weight) in scores {
                if let Some(&target) = token_index.get(token) {
                    edges.push(Edge {
                        source: NodeKey(document_index),
                        target,
                        weight,
                    });
                }
            }
        }

        Self {
            nodes,
            edges,
            frequency: CorpusFrequency(frequency),
            token_index,
            document_count: documents.len(),
        }
    }

    pub fn node(&self, key: NodeKey) -> Option<&Node> {
        self.nodes.get(key.0)
    }

    pub fn token_key(&self, token: &str) -> Option<NodeKey> {
        self.token_index.get(token).copied()
    }

    pub fn document_count(&self) -> usize {
        self.document_count
    }

    pub fn token_count(&self) -> usize {
        self.nodes.len() - self.document_count
    }

    pub fn keys(&self) -> impl Iterator<Item = NodeKey> {
        (0..self.nodes.len()).map(NodeKey)
    }

    /// Endpoint positions of an edge, resolved through the arena.
    pub fn edge_endpoints(&self, edge: &Edge) -> Option<(Pos2, Pos2)> {
        let source = self.node(edge.source)?.position();
        let target = self.node(edge.target)?.position();
        Some((source, target))
    }
}
