use super::ObjectId;
use crate::xr::Hand;
use crossbeam_channel::{unbounded, Receiver, Sender};
use glam::Vec3;
use serde::{Deserialize, Serialize};

/// 抓取事件
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum GraspEvent {
    /// 第一只手抓住对象
    Grasped { object: ObjectId, hand: Hand },
    /// 最后一只手松开对象
    Ungrasped {
        object: ObjectId,
        hand: Hand,
        release_velocity: Vec3,
        release_angular_velocity: Vec3,
    },
    /// 第二只手加入抓取
    HandAttached { object: ObjectId, hand: Hand },
    /// 两只手中的一只松开，对象仍被抓着
    HandDetached { object: ObjectId, hand: Hand },
    /// 对象被抓取驱动了一步
    GraspMoved { object: ObjectId },
    /// 开始悬停
    HoverStarted { object: ObjectId, hand: Hand },
    /// 结束悬停
    HoverEnded { object: ObjectId, hand: Hand },
}

impl GraspEvent {
    pub fn object(&self) -> ObjectId {
        match *self {
            GraspEvent::Grasped { object, .. }
            | GraspEvent::Ungrasped { object, .. }
            | GraspEvent::HandAttached { object, .. }
            | GraspEvent::HandDetached { object, .. }
            | GraspEvent::GraspMoved { object }
            | GraspEvent::HoverStarted { object, .. }
            | GraspEvent::HoverEnded { object, .. } => object,
        }
    }

    pub fn hand(&self) -> Option<Hand> {
        match *self {
            GraspEvent::Grasped { hand, .. }
            | GraspEvent::Ungrasped { hand, .. }
            | GraspEvent::HandAttached { hand, .. }
            | GraspEvent::HandDetached { hand, .. }
            | GraspEvent::HoverStarted { hand, .. }
            | GraspEvent::HoverEnded { hand, .. } => Some(hand),
            GraspEvent::GraspMoved { .. } => None,
        }
    }
}

/// 抓取事件处理器
pub trait GraspEventHandler: Send + Sync {
    fn handle_event(&mut self, event: &GraspEvent);
}

/// 抓取事件总线
///
/// 引擎在更新中只入队；`process_events` 时统一分发给已注册的处理器和
/// 通道订阅者。订阅者的接收端被丢弃后自动移除。
#[derive(Default)]
pub struct GraspEventBus {
    events: Vec<GraspEvent>,
    handlers: Vec<Box<dyn GraspEventHandler>>,
    subscribers: Vec<Sender<GraspEvent>>,
}

impl GraspEventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// 添加事件
    pub fn push_event(&mut self, event: GraspEvent) {
        self.events.push(event);
    }

    /// 注册事件处理器
    pub fn register_handler(&mut self, handler: Box<dyn GraspEventHandler>) {
        self.handlers.push(handler);
    }

    /// 订阅事件通道
    pub fn subscribe(&mut self) -> Receiver<GraspEvent> {
        let (tx, rx) = unbounded();
        self.subscribers.push(tx);
        rx
    }

    /// 待分发的事件
    pub fn pending(&self) -> &[GraspEvent] {
        &self.events
    }

    /// 分发所有事件
    pub fn process_events(&mut self) {
        let events = std::mem::take(&mut self.events);

        for event in &events {
            for handler in &mut self.handlers {
                handler.handle_event(event);
            }
        }

        self.subscribers
            .retain(|tx| events.iter().all(|event| tx.send(*event).is_ok()));
    }

    /// 取走所有事件，不经过处理器和订阅者
    pub fn drain(&mut self) -> Vec<GraspEvent> {
        std::mem::take(&mut self.events)
    }

    /// 清空事件队列
    pub fn clear(&mut self) {
        self.events.clear();
    }
}
