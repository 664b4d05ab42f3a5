//! Scripted `Backend` for driving the frame engine without a GPU
#![allow(dead_code)]

use motion_viewer::{
    backend::{Acquired, Backend, Presented},
    mv_error::MvError,
    resource_table::{Lifetime, ResourceKey, ResourceTable},
};
use std::{collections::VecDeque, sync::Once};

static INIT: Once = Once::new();

/// Initializes logging in a "once per test run" manner. Call at the start of
/// each test that needs logging.
pub fn init_tests() {
    INIT.call_once(|| {
        env_logger::init();
    });
}

pub const IMAGE_COUNT: u32 = 3;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FenceState {
    Signalled,
    /// Submitted work will signal it
    Pending,
    /// Nothing will signal it
    Reset,
}

#[derive(Debug)]
pub struct MockFence {
    pub id: usize,
    pub state: FenceState,
}

#[derive(Debug)]
pub struct MockSemaphore {
    pub signalled: bool,
}

#[derive(Debug)]
pub struct MockSwapchain {
    pub generation: u64,
    pub images: Vec<ResourceKey>,
}

/// What a recorded command buffer refers to
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MockCommands {
    pub slot: usize,
    pub image_index: u32,
    pub generation: u64,
}

#[derive(Debug)]
pub enum MockResource {
    Image,
    Buffer(Vec<u8>),
}

/// Every backend call in order
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Op {
    CreateSwapchain(u64),
    DestroySwapchain(u64),
    Wait { fence: usize, blocked: bool },
    Reset(usize),
    Acquire(Acquired),
    Write(ResourceKey),
    Submit { fence: usize, commands: MockCommands },
    Present(u32),
}

pub struct MockBackend {
    pub extent: [u32; 2],
    pub resources: ResourceTable<MockResource>,
    pub ops: Vec<Op>,
    /// Results handed out before falling back to the next image in turn
    pub acquire_script: VecDeque<Result<Acquired, MvError>>,
    pub present_script: VecDeque<Presented>,
    pub next_image: u32,
    pub fence_count: usize,
    pub semaphore_count: usize,
    pub max_in_flight: usize,
    in_flight: usize,
}

impl Default for MockBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MockBackend {
    pub fn new() -> Self {
        Self {
            extent: [800, 600],
            resources: ResourceTable::new(),
            ops: Vec::new(),
            acquire_script: VecDeque::new(),
            present_script: VecDeque::new(),
            next_image: 0,
            fence_count: 0,
            semaphore_count: 0,
            max_in_flight: 0,
            in_flight: 0,
        }
    }

    pub fn count(&self, f: impl Fn(&Op) -> bool) -> usize {
        self.ops.iter().filter(|op| f(op)).count()
    }

    pub fn blocked_waits(&self) -> usize {
        self.count(|op| matches!(op, Op::Wait { blocked: true, .. }))
    }

    pub fn submits(&self) -> usize {
        self.count(|op| matches!(op, Op::Submit { .. }))
    }

    pub fn presents(&self) -> usize {
        self.count(|op| matches!(op, Op::Present(_)))
    }

    /// Commands of the last submission
    pub fn last_commands(&self) -> Option<MockCommands> {
        self.ops.iter().rev().find_map(|op| match op {
            Op::Submit { commands, .. } => Some(*commands),
            _ => None,
        })
    }

    pub fn clear_ops(&mut self) {
        self.ops.clear();
    }
}

impl Backend for MockBackend {
    type Fence = MockFence;
    type Semaphore = MockSemaphore;
    type Swapchain = MockSwapchain;
    type Commands = MockCommands;

    fn surface_extent(&self) -> Result<[u32; 2], MvError> {
        Ok(self.extent)
    }

    fn create_swapchain(
        &mut self,
        previous: Option<MockSwapchain>,
    ) -> Result<MockSwapchain, MvError> {
        if let Some(previous) = previous {
            self.resources.release_generation(previous.generation);
        }
        let generation = self.resources.next_generation();
        let lifetime = Lifetime::Swapchain(generation);
        let images = (0..IMAGE_COUNT)
            .map(|_| self.resources.insert(MockResource::Image, lifetime))
            .collect();
        self.ops.push(Op::CreateSwapchain(generation));
        Ok(MockSwapchain { generation, images })
    }

    fn destroy_swapchain(
        &mut self,
        swapchain: MockSwapchain,
    ) -> Result<(), MvError> {
        self.resources.release_generation(swapchain.generation);
        self.ops.push(Op::DestroySwapchain(swapchain.generation));
        Ok(())
    }

    fn create_fence(&mut self) -> Result<MockFence, MvError> {
        self.fence_count += 1;
        Ok(MockFence {
            id: self.fence_count,
            state: FenceState::Signalled,
        })
    }

    fn wait_fence(&mut self, fence: &mut MockFence) -> Result<(), MvError> {
        let blocked = match fence.state {
            FenceState::Signalled => false,
            FenceState::Pending => {
                self.in_flight -= 1;
                true
            }
            FenceState::Reset => return Err(MvError::FenceError),
        };
        fence.state = FenceState::Signalled;
        self.ops.push(Op::Wait {
            fence: fence.id,
            blocked,
        });
        Ok(())
    }

    fn reset_fence(&mut self, fence: &mut MockFence) -> Result<(), MvError> {
        assert_eq!(fence.state, FenceState::Signalled, "reset while pending");
        fence.state = FenceState::Reset;
        self.ops.push(Op::Reset(fence.id));
        Ok(())
    }

    fn destroy_fence(&mut self, fence: MockFence) -> Result<(), MvError> {
        assert_ne!(fence.state, FenceState::Pending, "destroyed in flight");
        self.fence_count -= 1;
        Ok(())
    }

    fn create_semaphore(&mut self) -> Result<MockSemaphore, MvError> {
        self.semaphore_count += 1;
        Ok(MockSemaphore { signalled: false })
    }

    fn destroy_semaphore(
        &mut self,
        _semaphore: MockSemaphore,
    ) -> Result<(), MvError> {
        self.semaphore_count -= 1;
        Ok(())
    }

    fn acquire_next_image(
        &mut self,
        _swapchain: &MockSwapchain,
        image_available: &mut MockSemaphore,
    ) -> Result<Acquired, MvError> {
        let acquired = match self.acquire_script.pop_front() {
            Some(result) => result?,
            None => {
                let index = self.next_image;
                self.next_image = (self.next_image + 1) % IMAGE_COUNT;
                Acquired::Image {
                    index,
                    suboptimal: false,
                }
            }
        };
        if let Acquired::Image { .. } = acquired {
            image_available.signalled = true;
        }
        self.ops.push(Op::Acquire(acquired));
        Ok(acquired)
    }

    fn submit(
        &mut self,
        commands: MockCommands,
        wait: &mut MockSemaphore,
        signal: &mut MockSemaphore,
        fence: &mut MockFence,
    ) -> Result<(), MvError> {
        if !wait.signalled {
            return Err(MvError::SemaphoreNotSignalled);
        }
        wait.signalled = false;
        signal.signalled = true;
        fence.state = FenceState::Pending;
        self.in_flight += 1;
        self.max_in_flight = self.max_in_flight.max(self.in_flight);
        self.ops.push(Op::Submit {
            fence: fence.id,
            commands,
        });
        Ok(())
    }

    fn present(
        &mut self,
        _swapchain: &MockSwapchain,
        image_index: u32,
        wait: &mut MockSemaphore,
        _fence: &mut MockFence,
    ) -> Result<Presented, MvError> {
        if !wait.signalled {
            return Err(MvError::SemaphoreNotSignalled);
        }
        wait.signalled = false;
        self.ops.push(Op::Present(image_index));
        Ok(self.present_script.pop_front().unwrap_or(Presented::Done))
    }

    fn create_buffer(&mut self, size: usize) -> Result<ResourceKey, MvError> {
        Ok(self
            .resources
            .insert(MockResource::Buffer(vec![0; size]), Lifetime::Persistent))
    }

    fn write_buffer(
        &mut self,
        buffer: ResourceKey,
        bytes: &[u8],
    ) -> Result<(), MvError> {
        match self.resources.get_mut(buffer)? {
            MockResource::Buffer(data) => {
                if data.len() != bytes.len() {
                    return Err(MvError::BufferSizeMismatch {
                        expected: data.len(),
                        found: bytes.len(),
                    });
                }
                data.copy_from_slice(bytes);
            }
            MockResource::Image => return Err(MvError::WrongResourceKind),
        }
        self.ops.push(Op::Write(buffer));
        Ok(())
    }

    fn destroy_buffer(&mut self, buffer: ResourceKey) -> Result<(), MvError> {
        self.resources.release(buffer)?;
        Ok(())
    }
}

/// Record closure for tests that don't touch uniforms
pub fn record(
    _backend: &mut MockBackend,
    swapchain: &MockSwapchain,
    target: motion_viewer::frame_control::FrameTarget,
) -> Result<MockCommands, MvError> {
    Ok(MockCommands {
        slot: target.slot,
        image_index: target.image_index,
        generation: swapchain.generation,
    })
}
