use std::{future::Future, pin::Pin, sync::Arc};

use crate::events::{
    EventHandler,
    EventProducer,
    Handler,
    PointsCreditedEvent,
    ReviewRequiredEvent,
    StatusChangedEvent,
};

#[derive(Default, Clone)]
pub struct EventProducers {
    pub status_changed_producer: Vec<EventProducer<StatusChangedEvent>>,
    pub points_credited_producer: Vec<EventProducer<PointsCreditedEvent>>,
    pub review_required_producer: Vec<EventProducer<ReviewRequiredEvent>>,
}

pub struct EventHandlers {
    pub on_status_changed: Option<EventHandler<StatusChangedEvent>>,
    pub on_points_credited: Option<EventHandler<PointsCreditedEvent>>,
    pub on_review_required: Option<EventHandler<ReviewRequiredEvent>>,
}

impl EventHandlers {
    pub fn new(buffer_size: usize, hooks: EventHooks) -> Self {
        let on_status_changed = hooks.on_status_changed.map(|f| EventHandler::new(buffer_size, f));
        let on_points_credited = hooks.on_points_credited.map(|f| EventHandler::new(buffer_size, f));
        let on_review_required = hooks.on_review_required.map(|f| EventHandler::new(buffer_size, f));
        Self { on_status_changed, on_points_credited, on_review_required }
    }

    pub fn producers(&self) -> EventProducers {
        let mut result = EventProducers::default();
        if let Some(handler) = &self.on_status_changed {
            result.status_changed_producer.push(handler.subscribe());
        }
        if let Some(handler) = &self.on_points_credited {
            result.points_credited_producer.push(handler.subscribe());
        }
        if let Some(handler) = &self.on_review_required {
            result.review_required_producer.push(handler.subscribe());
        }
        result
    }

    pub async fn start_handlers(self) {
        if let Some(handler) = self.on_status_changed {
            tokio::spawn(handler.start_handler());
        }
        if let Some(handler) = self.on_points_credited {
            tokio::spawn(handler.start_handler());
        }
        if let Some(handler) = self.on_review_required {
            tokio::spawn(handler.start_handler());
        }
    }
}

type BoxedHook<E> = dyn (Fn(E) -> Pin<Box<dyn Future<Output = ()> + Send>>) + Send + Sync;

#[derive(Default, Clone)]
pub struct EventHooks {
    pub on_status_changed: Option<Handler<StatusChangedEvent>>,
    pub on_points_credited: Option<Handler<PointsCreditedEvent>>,
    pub on_review_required: Option<Handler<ReviewRequiredEvent>>,
}

impl EventHooks {
    pub fn on_status_changed<F>(&mut self, f: F) -> &mut Self
    where F: (Fn(StatusChangedEvent) -> Pin<Box<dyn Future<Output = ()> + Send>>) + Send + Sync + 'static {
        self.on_status_changed = Some(Arc::new(f) as Arc<BoxedHook<StatusChangedEvent>>);
        self
    }

    pub fn on_points_credited<F>(&mut self, f: F) -> &mut Self
    where F: (Fn(PointsCreditedEvent) -> Pin<Box<dyn Future<Output = ()> + Send>>) + Send + Sync + 'static {
        self.on_points_credited = Some(Arc::new(f) as Arc<BoxedHook<PointsCreditedEvent>>);
        self
    }

    pub fn on_review_required<F>(&mut self, f: F) -> &mut Self
    where F: (Fn(ReviewRequiredEvent) -> Pin<Box<dyn Future<Output = ()> + Send>>) + Send + Sync + 'static {
        self.on_review_required = Some(Arc::new(f) as Arc<BoxedHook<ReviewRequiredEvent>>);
        self
    }
}
