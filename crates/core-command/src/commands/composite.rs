use core_model::CanonicalState;

use crate::command::{BoxedCommand, Command, CommandError};
use crate::meta::CommandMeta;
use crate::serialized::SerializedCommand;

/// A fixed-order bundle of commands applied/inverted as one undo step:
/// applies children in order, inverts by inverting each child in reverse
/// order.
#[derive(Debug, Clone)]
pub struct Composite {
    pub meta: CommandMeta,
    pub children: Vec<BoxedCommand>,
}

impl Command for Composite {
    fn meta(&self) -> &CommandMeta {
        &self.meta
    }

    fn apply(&self, state: &CanonicalState) -> Result<CanonicalState, CommandError> {
        let mut current = state.clone();
        for child in &self.children {
            current = child.apply(&current)?;
        }
        Ok(current)
    }

    fn invert(&self, prev: &CanonicalState, _next: &CanonicalState) -> BoxedCommand {
        // Replay forward to capture each child's own (prev, next) pair, then
        // invert each child against that pair and reverse the result order.
        let mut states = Vec::with_capacity(self.children.len() + 1);
        states.push(prev.clone());
        for child in &self.children {
            let applied = child
                .apply(states.last().expect("states is never empty"))
                .unwrap_or_else(|_| states.last().unwrap().clone());
            states.push(applied);
        }
        let inverted_children: Vec<BoxedCommand> = self
            .children
            .iter()
            .enumerate()
            .rev()
            .map(|(i, child)| child.invert(&states[i], &states[i + 1]))
            .collect();
        Box::new(Composite {
            meta: CommandMeta::new("Undo Composite", self.meta.scope, self.meta.timestamp_ms),
            children: inverted_children,
        })
    }

    fn estimate_size(&self) -> usize {
        self.children.iter().map(|c| c.estimate_size()).sum::<usize>() + 64
    }

    fn serialize(&self) -> SerializedCommand {
        SerializedCommand::Composite {
            meta: self.meta.clone(),
            children: self.children.iter().map(|c| c.serialize()).collect(),
        }
    }

    fn clone_box(&self) -> BoxedCommand {
        Box::new(self.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::layer_ops::AddLayer;
    use crate::meta::Scope;
    use core_model::document::ParamMap;
    use core_model::{AddPosition, ImageLayer, Layer, LayerBase, LayerId};

    fn layer(id: &str) -> Layer {
        Layer::Image(ImageLayer {
            base: LayerBase::new(LayerId::new(id), id),
            image: None,
            is_empty: true,
            filters: ParamMap::new(),
            tracks: Default::default(),
        })
    }

    #[test]
    fn composite_applies_in_order_and_inverts_in_reverse() {
        let state = CanonicalState::new(100, 100);
        let add_a = AddLayer {
            meta: CommandMeta::new("Add A", Scope::Layers, 0),
            layer: layer("A"),
            position: AddPosition::Top,
        };
        let add_b = AddLayer {
            meta: CommandMeta::new("Add B", Scope::Layers, 0),
            layer: layer("B"),
            position: AddPosition::Top,
        };
        let composite = Composite {
            meta: CommandMeta::new("Add A+B", Scope::Layers, 0),
            children: vec![Box::new(add_a), Box::new(add_b)],
        };
        let next = composite.apply(&state).unwrap();
        assert_eq!(next.layers.order[0], LayerId::new("B"));
        assert_eq!(next.layers.order[1], LayerId::new("A"));

        let inverse = composite.invert(&state, &next);
        let back = inverse.apply(&next).unwrap();
        assert_eq!(back, state);
    }
}
