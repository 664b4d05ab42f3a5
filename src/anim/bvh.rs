use super::{
    evaluate::decode_frame,
    skeleton::Skeleton,
    types::{AnimError, Channel, Joint, Motion},
};
use crate::mv_error::MvError;
use log::info;
use nalgebra_glm as glm;
use std::path::Path;

/// A parsed BVH file before validation
#[derive(Clone, Debug)]
pub struct BvhFile {
    pub joints: Vec<Joint>,
    pub frame_time: f32,
    pub frames: Vec<Vec<f32>>,
}

impl BvhFile {
    /// Validates the hierarchy
    ///
    /// # Errors
    /// Returns `AnimError` for structural problems or too many joints
    pub fn load_hierarchy(&self) -> Result<Skeleton, AnimError> {
        Skeleton::new(self.joints.clone())
    }

    /// Decodes every frame against a validated hierarchy
    ///
    /// # Errors
    /// Returns `AnimError` if a frame does not match the hierarchy
    pub fn load_frames(
        &self,
        skeleton: &Skeleton,
    ) -> Result<Motion, AnimError> {
        if self.frames.is_empty() {
            return Err(AnimError::EmptyMotion);
        }
        let frames = self
            .frames
            .iter()
            .enumerate()
            .map(|(i, values)| decode_frame(skeleton, i, values.clone()))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Motion {
            frame_time: self.frame_time,
            frames,
        })
    }
}

/// Parses and validates BVH text in one step
///
/// # Errors
/// Returns `AnimError` for syntax or structural problems
pub fn parse(text: &str) -> Result<(Skeleton, Motion), AnimError> {
    let file = parse_file(text)?;
    let skeleton = file.load_hierarchy()?;
    let motion = file.load_frames(&skeleton)?;
    Ok((skeleton, motion))
}

/// Reads, parses and validates a BVH file
///
/// # Errors
/// Returns `MvError` for IO, syntax or structural problems
pub fn load(path: &Path) -> Result<(Skeleton, Motion), MvError> {
    let text = std::fs::read_to_string(path)?;
    let (skeleton, motion) = parse(&text)?;
    info!(
        "Loaded {:?}: {} joints, {} frames at {:.1} fps",
        path,
        skeleton.len(),
        motion.len(),
        motion.fps()
    );
    Ok((skeleton, motion))
}

/// Whitespace separated tokens with their line numbers
struct Tokens<'a> {
    items: Vec<(usize, &'a str)>,
    pos: usize,
    line: usize,
}

impl<'a> Tokens<'a> {
    fn new(text: &'a str) -> Self {
        Self {
            items: text
                .lines()
                .enumerate()
                .flat_map(|(i, l)| {
                    l.split_whitespace().map(move |t| (i + 1, t))
                })
                .collect(),
            pos: 0,
            line: 0,
        }
    }

    fn next(&mut self) -> Result<&'a str, AnimError> {
        let (line, token) =
            *self.items.get(self.pos).ok_or(AnimError::UnexpectedEnd)?;
        self.pos += 1;
        self.line = line;
        Ok(token)
    }

    fn is_done(&self) -> bool {
        self.pos >= self.items.len()
    }

    fn error(&self, message: String) -> AnimError {
        AnimError::Syntax {
            line: self.line,
            message,
        }
    }

    fn expect(&mut self, expected: &str) -> Result<(), AnimError> {
        let token = self.next()?;
        if token == expected {
            Ok(())
        } else {
            Err(self.error(format!("expected {expected}, found {token}")))
        }
    }

    fn number<T: std::str::FromStr>(&mut self) -> Result<T, AnimError> {
        let token = self.next()?;
        token
            .parse()
            .map_err(|_| self.error(format!("{token} is not a number")))
    }

    fn offset(&mut self) -> Result<glm::Vec3, AnimError> {
        self.expect("OFFSET")?;
        Ok(glm::vec3(self.number()?, self.number()?, self.number()?))
    }
}

/// Parses BVH text without validating the hierarchy
///
/// # Errors
/// Returns `AnimError::Syntax` with the offending line
pub fn parse_file(text: &str) -> Result<BvhFile, AnimError> {
    let mut tokens = Tokens::new(text);

    tokens.expect("HIERARCHY")?;
    let mut joints = Vec::new();
    loop {
        match tokens.next()? {
            "ROOT" => parse_joint(&mut tokens, &mut joints, None)?,
            "MOTION" => break,
            t => {
                return Err(tokens.error(format!("expected ROOT, found {t}")))
            }
        }
    }

    tokens.expect("Frames:")?;
    let declared: usize = tokens.number()?;
    tokens.expect("Frame")?;
    tokens.expect("Time:")?;
    let frame_time: f32 = tokens.number()?;

    // `declared` is only trusted once the values are there to back it
    let channel_count: usize = joints.iter().map(|j| j.channels.len()).sum();
    let mut values = Vec::new();
    while !tokens.is_done() {
        values.push(tokens.number::<f32>()?);
    }
    let frames: Vec<Vec<f32>> = if channel_count == 0 {
        if !values.is_empty() {
            return Err(AnimError::ChannelCount {
                frame: 0,
                expected: 0,
                found: values.len(),
            });
        }
        Vec::new()
    } else {
        if values.len() % channel_count != 0 {
            return Err(AnimError::ChannelCount {
                frame: values.len() / channel_count,
                expected: channel_count,
                found: values.len() % channel_count,
            });
        }
        values.chunks(channel_count).map(<[f32]>::to_vec).collect()
    };
    if frames.len() != declared {
        return Err(AnimError::FrameCount {
            declared,
            found: frames.len(),
        });
    }

    Ok(BvhFile {
        joints,
        frame_time,
        frames,
    })
}

/// Parses a `ROOT` or `JOINT` block after its keyword. Joints are pushed in
/// declaration order which is also the order of their motion values.
fn parse_joint(
    tokens: &mut Tokens,
    joints: &mut Vec<Joint>,
    parent: Option<usize>,
) -> Result<(), AnimError> {
    let name = tokens.next()?;
    tokens.expect("{")?;
    let offset = tokens.offset()?;
    let index = joints.len();
    joints.push(Joint::new(name, parent, offset));

    loop {
        match tokens.next()? {
            "CHANNELS" => {
                let count: usize = tokens.number()?;
                if count > 6 {
                    return Err(
                        tokens.error(format!("{count} channels on {name}"))
                    );
                }
                for _ in 0..count {
                    let token = tokens.next()?;
                    let channel = Channel::parse(token).ok_or_else(|| {
                        tokens.error(format!("unknown channel {token}"))
                    })?;
                    joints[index].channels.push(channel);
                }
            }
            "JOINT" => parse_joint(tokens, joints, Some(index))?,
            "End" => {
                tokens.expect("Site")?;
                tokens.expect("{")?;
                let offset = tokens.offset()?;
                tokens.expect("}")?;
                let mut end =
                    Joint::new(&format!("{name}_End"), Some(index), offset);
                end.end_site = true;
                joints.push(end);
            }
            "}" => return Ok(()),
            t => {
                return Err(tokens.error(format!("unexpected {t} in {name}")))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SMALL: &str = "HIERARCHY
ROOT Hips
{
\tOFFSET 0.0 0.0 0.0
\tCHANNELS 6 Xposition Yposition Zposition Zrotation Xrotation Yrotation
\tJOINT Chest
\t{
\t\tOFFSET 0.0 5.0 0.0
\t\tCHANNELS 3 Zrotation Xrotation Yrotation
\t\tEnd Site
\t\t{
\t\t\tOFFSET 0.0 3.0 0.0
\t\t}
\t}
}
MOTION
Frames: 2
Frame Time: 0.033333
0 1 2 0 0 0 10 0 0
0 1 2 0 0 0 20 0 0
";

    #[test]
    fn parses_hierarchy_and_frames() {
        let (skeleton, motion) = parse(SMALL).unwrap();
        assert_eq!(skeleton.len(), 3);
        assert_eq!(skeleton.joints()[1].name, "Chest");
        assert_eq!(skeleton.joints()[1].parent, Some(0));
        assert!(skeleton.joints()[2].end_site);
        assert_eq!(skeleton.joints()[2].name, "Chest_End");
        assert_eq!(skeleton.channel_count(), 9);
        assert_eq!(motion.len(), 2);
        assert_eq!(motion.frames[1].values[6], 20.0);
        assert!(motion.frames[0].translations[0].is_some());
        assert!(motion.frames[0].translations[1].is_none());
    }

    #[test]
    fn short_motion_is_rejected() {
        let text = SMALL.replace("Frames: 2", "Frames: 3");
        assert_eq!(
            parse(&text).unwrap_err(),
            AnimError::FrameCount {
                declared: 3,
                found: 2
            }
        );
    }

    #[test]
    fn huge_frame_count_is_rejected() {
        let text = SMALL.replace("Frames: 2", "Frames: 100000000000000");
        assert_eq!(
            parse(&text).unwrap_err(),
            AnimError::FrameCount {
                declared: 100_000_000_000_000,
                found: 2
            }
        );
    }

    #[test]
    fn channelless_hierarchy_has_no_frames() {
        let text = "HIERARCHY
ROOT Hips
{
\tOFFSET 0 0 0
\tCHANNELS 0
}
MOTION
Frames: 4000000000000000000
Frame Time: 0.1
";
        assert_eq!(
            parse_file(text).unwrap_err(),
            AnimError::FrameCount {
                declared: 4_000_000_000_000_000_000,
                found: 0
            }
        );
    }

    #[test]
    fn ragged_motion_is_rejected() {
        let text = SMALL.replace("20 0 0\n", "20 0\n");
        assert!(matches!(
            parse(&text),
            Err(AnimError::ChannelCount { .. })
        ));
    }

    #[test]
    fn syntax_error_reports_line() {
        let text =
            SMALL.replace("CHANNELS 3 Zrotation", "CHANNELS 3 Wrotation");
        assert!(matches!(
            parse(&text),
            Err(AnimError::Syntax { line: 9, .. })
        ));
    }
}
