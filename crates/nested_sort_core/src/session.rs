use crate::tree::NodeId;

/// The single drag gesture in flight, if any.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum DragSession {
    #[default]
    Idle,
    Dragging {
        dragged: NodeId,
    },
    Targeting {
        dragged: NodeId,
        targeted: NodeId,
    },
}

impl DragSession {
    pub fn is_idle(&self) -> bool {
        matches!(self, DragSession::Idle)
    }

    pub fn dragged(&self) -> Option<NodeId> {
        match *self {
            DragSession::Idle => None,
            DragSession::Dragging { dragged } | DragSession::Targeting { dragged, .. } => {
                Some(dragged)
            }
        }
    }

    pub fn targeted(&self) -> Option<NodeId> {
        match *self {
            DragSession::Targeting { targeted, .. } => Some(targeted),
            _ => None,
        }
    }

    /// Begin a gesture; refused while another one is running.
    pub(crate) fn start(&mut self, dragged: NodeId) -> bool {
        if !self.is_idle() {
            return false;
        }
        *self = DragSession::Dragging { dragged };
        true
    }

    /// Point the gesture at `targeted`, returning the node it replaced.
    pub(crate) fn target(&mut self, targeted: NodeId) -> Option<NodeId> {
        let previous = self.targeted();
        if let Some(dragged) = self.dragged() {
            *self = DragSession::Targeting { dragged, targeted };
        }
        previous
    }

    /// Forget the current target but keep dragging.
    pub(crate) fn untarget(&mut self) {
        if let DragSession::Targeting { dragged, .. } = *self {
            *self = DragSession::Dragging { dragged };
        }
    }

    pub(crate) fn finish(&mut self) -> DragSession {
        std::mem::take(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::Tree;

    #[test]
    fn walks_idle_dragging_targeting_idle() {
        let mut tree = Tree::default();
        let a = tree.create_item("a", None);
        let b = tree.create_item("b", None);

        let mut session = DragSession::default();
        assert_eq!(session.target(b), None);
        assert!(session.is_idle());

        assert!(session.start(a));
        assert!(!session.start(b));
        assert_eq!(session.dragged(), Some(a));
        assert_eq!(session.targeted(), None);

        assert_eq!(session.target(b), None);
        assert_eq!(session.target(a), Some(b));
        assert_eq!(session.targeted(), Some(a));

        session.untarget();
        assert_eq!(session, DragSession::Dragging { dragged: a });

        let finished = session.finish();
        assert_eq!(finished.dragged(), Some(a));
        assert!(session.is_idle());
    }
}
