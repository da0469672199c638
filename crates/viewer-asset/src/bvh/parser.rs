use std::{
    fmt::{self, Display, Formatter},
    str::FromStr,
};

use glam::Vec3;
use log::debug;

use super::{Channel, Joint, JointId, JointKind, MotionClip, SkeletalMotion, SkeletonHierarchy};

const MAX_CHANNELS: i64 = 6;

#[derive(Debug, Clone, PartialEq)]
pub enum ParseError {
    UnexpectedEnd {
        expected: &'static str,
    },
    UnexpectedToken {
        line: usize,
        expected: &'static str,
        found: String,
    },
    UnbalancedBraces {
        line: usize,
    },
    BadChannelCount {
        line: usize,
        joint: String,
        declared: i64,
    },
    UnknownChannel {
        line: usize,
        name: String,
    },
    BadNumber {
        line: usize,
        text: String,
    },
    BadFrameTime {
        line: usize,
        value: f32,
    },
    ValueCountMismatch {
        expected: usize,
        actual: usize,
    },
}

impl Display for ParseError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            ParseError::UnexpectedEnd { expected } => {
                write!(f, "Unexpected end of motion text, expected {}", expected)
            }
            ParseError::UnexpectedToken {
                line,
                expected,
                found,
            } => write!(
                f,
                "Line {}: expected {}, found \"{}\"",
                line, expected, found
            ),
            ParseError::UnbalancedBraces { line } => {
                write!(f, "Line {}: unbalanced braces in hierarchy", line)
            }
            ParseError::BadChannelCount {
                line,
                joint,
                declared,
            } => write!(
                f,
                "Line {}: joint \"{}\" declares a bad channel count {}",
                line, joint, declared
            ),
            ParseError::UnknownChannel { line, name } => {
                write!(f, "Line {}: unknown channel \"{}\"", line, name)
            }
            ParseError::BadNumber { line, text } => {
                write!(f, "Line {}: \"{}\" is not a number", line, text)
            }
            ParseError::BadFrameTime { line, value } => {
                write!(f, "Line {}: bad frame time {}", line, value)
            }
            ParseError::ValueCountMismatch { expected, actual } => write!(
                f,
                "Motion block has {} values, expected {}",
                actual, expected
            ),
        }
    }
}

impl std::error::Error for ParseError {}

fn is_structural(text: &str) -> bool {
    matches!(
        text,
        "{" | "}" | "OFFSET" | "CHANNELS" | "JOINT" | "End" | "MOTION"
    ) || text.parse::<f32>().is_ok()
}

#[derive(Debug, Clone, Copy)]
struct Token<'a> {
    text: &'a str,
    line: usize,
}

struct Parser<'a> {
    tokens: Vec<Token<'a>>,
    position: usize,
    joints: Vec<Joint>,
    channel_count: usize,
}

impl<'a> Parser<'a> {
    fn new(text: &'a str) -> Self {
        let tokens = text
            .lines()
            .enumerate()
            .flat_map(|(index, line)| {
                line.split_whitespace().map(move |text| Token {
                    text,
                    line: index + 1,
                })
            })
            .collect();
        Self {
            tokens,
            position: 0,
            joints: Vec::new(),
            channel_count: 0,
        }
    }

    fn peek(&self) -> Option<Token<'a>> {
        self.tokens.get(self.position).copied()
    }

    fn advance(&mut self, expected: &'static str) -> Result<Token<'a>, ParseError> {
        let token = self
            .peek()
            .ok_or(ParseError::UnexpectedEnd { expected })?;
        self.position += 1;
        Ok(token)
    }

    fn expect(&mut self, keyword: &'static str) -> Result<Token<'a>, ParseError> {
        let token = self.advance(keyword)?;
        if token.text == keyword {
            Ok(token)
        } else {
            Err(ParseError::UnexpectedToken {
                line: token.line,
                expected: keyword,
                found: token.text.to_string(),
            })
        }
    }

    fn number<T: FromStr>(&mut self, expected: &'static str) -> Result<T, ParseError> {
        let token = self.advance(expected)?;
        token.text.parse().map_err(|_| ParseError::BadNumber {
            line: token.line,
            text: token.text.to_string(),
        })
    }

    /// Joint names run to the end of their line.
    fn name(&mut self) -> Result<String, ParseError> {
        let first = self.advance("joint name")?;
        let mut parts = vec![first.text];
        while let Some(token) = self
            .peek()
            .filter(|token| token.line == first.line && token.text != "{")
        {
            parts.push(token.text);
            self.position += 1;
        }
        Ok(parts.join(" "))
    }

    fn offset(&mut self) -> Result<Vec3, ParseError> {
        self.expect("OFFSET")?;
        let x = self.number("offset")?;
        let y = self.number("offset")?;
        let z = self.number("offset")?;
        Ok(Vec3::new(x, y, z))
    }

    fn push_joint(
        &mut self,
        name: String,
        kind: JointKind,
        parent: Option<JointId>,
    ) -> JointId {
        let id = self.joints.len();
        self.joints.push(Joint {
            name,
            kind,
            offset: Vec3::ZERO,
            channels: Vec::new(),
            channel_start: self.channel_count,
            parent,
            children: Vec::new(),
        });
        if let Some(parent) = parent {
            self.joints[parent].children.push(id);
        }
        id
    }

    fn channels(&mut self, id: JointId) -> Result<(), ParseError> {
        let keyword = self.expect("CHANNELS")?;
        let declared: i64 = self.number("channel count")?;
        if !(0..=MAX_CHANNELS).contains(&declared) {
            return Err(ParseError::BadChannelCount {
                line: keyword.line,
                joint: self.joints[id].name.clone(),
                declared,
            });
        }
        if !self.joints[id].channels.is_empty() {
            return Err(ParseError::BadChannelCount {
                line: keyword.line,
                joint: self.joints[id].name.clone(),
                declared,
            });
        }
        let mut channels = Vec::with_capacity(declared as usize);
        for _ in 0..declared {
            let token = self.advance("channel name")?;
            let channel = match Channel::from_name(token.text) {
                Some(channel) => channel,
                None if is_structural(token.text) => {
                    // Fewer names than declared
                    return Err(ParseError::BadChannelCount {
                        line: keyword.line,
                        joint: self.joints[id].name.clone(),
                        declared,
                    });
                }
                None => {
                    return Err(ParseError::UnknownChannel {
                        line: token.line,
                        name: token.text.to_string(),
                    })
                }
            };
            if channels.contains(&channel) {
                return Err(ParseError::BadChannelCount {
                    line: keyword.line,
                    joint: self.joints[id].name.clone(),
                    declared,
                });
            }
            channels.push(channel);
        }
        let joint = &mut self.joints[id];
        joint.channel_start = self.channel_count;
        self.channel_count += channels.len();
        joint.channels = channels;
        Ok(())
    }

    fn end_site(&mut self, parent: JointId) -> Result<(), ParseError> {
        self.expect("Site")?;
        let open = self.expect("{")?;
        let name = format!("{} End Site", self.joints[parent].name);
        let id = self.push_joint(name, JointKind::EndSite, Some(parent));
        if self.peek().map(|token| token.text) == Some("OFFSET") {
            self.joints[id].offset = self.offset()?;
        }
        match self.peek() {
            Some(token) if token.text == "}" => {
                self.position += 1;
                Ok(())
            }
            Some(token) => Err(ParseError::UnexpectedToken {
                line: token.line,
                expected: "}",
                found: token.text.to_string(),
            }),
            None => Err(ParseError::UnbalancedBraces { line: open.line }),
        }
    }

    fn joint(&mut self, kind: JointKind, parent: Option<JointId>) -> Result<JointId, ParseError> {
        let name = self.name()?;
        let open = self.expect("{")?;
        let id = self.push_joint(name, kind, parent);
        loop {
            let Some(token) = self.peek() else {
                return Err(ParseError::UnbalancedBraces { line: open.line });
            };
            match token.text {
                "OFFSET" => self.joints[id].offset = self.offset()?,
                "CHANNELS" => self.channels(id)?,
                "JOINT" => {
                    self.position += 1;
                    self.joint(JointKind::Joint, Some(id))?;
                }
                "End" => {
                    self.position += 1;
                    self.end_site(id)?;
                }
                "}" => {
                    self.position += 1;
                    return Ok(id);
                }
                "MOTION" | "ROOT" => {
                    return Err(ParseError::UnbalancedBraces { line: open.line });
                }
                _ => {
                    return Err(ParseError::UnexpectedToken {
                        line: token.line,
                        expected: "OFFSET, CHANNELS, JOINT, End Site or }",
                        found: token.text.to_string(),
                    })
                }
            }
        }
    }

    fn hierarchy(&mut self) -> Result<SkeletonHierarchy, ParseError> {
        self.expect("HIERARCHY")?;
        self.expect("ROOT")?;
        self.joint(JointKind::Root, None)?;
        if let Some(token) = self.peek() {
            if token.text == "}" {
                return Err(ParseError::UnbalancedBraces { line: token.line });
            }
        }
        Ok(SkeletonHierarchy {
            joints: std::mem::take(&mut self.joints),
            channel_count: self.channel_count,
        })
    }

    /// Accepts both `Frames: 10` and `Frames:10`.
    fn labelled_number<T: FromStr>(&mut self, label: &'static str) -> Result<T, ParseError> {
        let token = self.advance(label)?;
        match token.text.strip_prefix(label) {
            Some("") => self.number(label),
            Some(rest) => rest.parse().map_err(|_| ParseError::BadNumber {
                line: token.line,
                text: rest.to_string(),
            }),
            None => Err(ParseError::UnexpectedToken {
                line: token.line,
                expected: label,
                found: token.text.to_string(),
            }),
        }
    }

    fn motion(&mut self, channels_per_frame: usize) -> Result<MotionClip, ParseError> {
        self.expect("MOTION")?;
        let frame_count: usize = self.labelled_number("Frames:")?;
        self.expect("Frame")?;
        let frame_time_line = self.peek().map(|token| token.line).unwrap_or_default();
        let frame_time: f32 = self.labelled_number("Time:")?;
        if !frame_time.is_finite() || frame_time < 0.0 {
            return Err(ParseError::BadFrameTime {
                line: frame_time_line,
                value: frame_time,
            });
        }

        let remaining = &self.tokens[self.position..];
        let values = remaining
            .iter()
            .map(|token| {
                token.text.parse::<f32>().map_err(|_| ParseError::BadNumber {
                    line: token.line,
                    text: token.text.to_string(),
                })
            })
            .collect::<Result<Vec<f32>, ParseError>>()?;
        self.position = self.tokens.len();

        let expected = frame_count
            .checked_mul(channels_per_frame)
            .unwrap_or(usize::MAX);
        if values.len() != expected {
            return Err(ParseError::ValueCountMismatch {
                expected,
                actual: values.len(),
            });
        }
        Ok(MotionClip {
            frame_count,
            frame_time,
            channels_per_frame,
            values,
        })
    }
}

pub(super) fn parse(text: &str) -> Result<SkeletalMotion, ParseError> {
    let mut parser = Parser::new(text);
    let hierarchy = parser.hierarchy()?;
    let clip = parser.motion(hierarchy.channel_count)?;
    debug!(
        "Parsed skeletal motion: {} joints, {} channels, {} frames",
        hierarchy.len(),
        hierarchy.channel_count,
        clip.frame_count
    );
    Ok(SkeletalMotion { hierarchy, clip })
}

#[cfg(test)]
mod test {
    use super::*;

    fn two_joint_text(frames: usize, values: usize) -> String {
        let mut text = String::from(
            "HIERARCHY
ROOT Hips
{
  OFFSET 0 0 0
  CHANNELS 3 Xposition Yposition Zposition
  JOINT Spine
  {
    OFFSET 0 1 0
    CHANNELS 3 Zrotation Xrotation Yrotation
    End Site
    {
      OFFSET 0 1 0
    }
  }
}
MOTION
",
        );
        text.push_str(&format!("Frames: {}\nFrame Time: 0.033333\n", frames));
        let line: Vec<String> = (0..values).map(|value| value.to_string()).collect();
        text.push_str(&line.join(" "));
        text.push('\n');
        text
    }

    #[test]
    fn test_parse_hierarchy() {
        let motion = parse(&two_joint_text(2, 12)).unwrap();
        let hierarchy = &motion.hierarchy;
        assert_eq!(hierarchy.len(), 3);
        assert_eq!(hierarchy.channel_count(), 6);
        assert_eq!(hierarchy.root().name(), "Hips");
        assert_eq!(hierarchy.root().kind(), JointKind::Root);
        assert_eq!(hierarchy.root().children(), &[1]);

        let spine = hierarchy.joint(1).unwrap();
        assert_eq!(spine.name(), "Spine");
        assert_eq!(spine.parent(), Some(0));
        assert_eq!(spine.channel_start(), 3);
        assert_eq!(
            spine.channels(),
            &[Channel::Zrotation, Channel::Xrotation, Channel::Yrotation]
        );

        let end = hierarchy.joint(2).unwrap();
        assert!(end.is_end_site());
        assert!(end.channels().is_empty());
        assert_eq!(end.offset(), Vec3::new(0.0, 1.0, 0.0));
        assert_eq!(hierarchy.find("Spine"), Some(1));

        assert_eq!(motion.clip.frame_count(), 2);
        assert_eq!(motion.clip.frame(1), &[6.0, 7.0, 8.0, 9.0, 10.0, 11.0]);
        assert_eq!(motion.clip.fps(), 30);
    }

    #[test]
    fn test_value_count_mismatch() {
        let result = parse(&two_joint_text(10, 55));
        assert_eq!(
            result,
            Err(ParseError::ValueCountMismatch {
                expected: 60,
                actual: 55
            })
        );
    }

    #[test]
    fn test_values_may_span_lines_freely() {
        let text = two_joint_text(2, 12).replace("5 6", "5\n6");
        assert!(parse(&text).is_ok());
    }

    #[test]
    fn test_unbalanced_braces() {
        let text = two_joint_text(1, 6).replacen("  }\n}\n", "  }\n", 1);
        assert!(matches!(
            parse(&text),
            Err(ParseError::UnbalancedBraces { line: 3 })
        ));

        let text = two_joint_text(1, 6).replacen("}\nMOTION", "}\n}\nMOTION", 1);
        assert!(matches!(
            parse(&text),
            Err(ParseError::UnbalancedBraces { .. })
        ));
    }

    #[test]
    fn test_negative_channel_count() {
        let text = two_joint_text(1, 6).replace("CHANNELS 3 Xposition", "CHANNELS -3 Xposition");
        assert!(matches!(
            parse(&text),
            Err(ParseError::BadChannelCount {
                line: 5,
                declared: -3,
                ..
            })
        ));
    }

    #[test]
    fn test_channel_names_fewer_than_declared() {
        let text = two_joint_text(1, 6).replace(
            "CHANNELS 3 Zrotation Xrotation Yrotation",
            "CHANNELS 4 Zrotation Xrotation Yrotation",
        );
        assert!(matches!(
            parse(&text),
            Err(ParseError::BadChannelCount { declared: 4, .. })
        ));
    }

    #[test]
    fn test_unknown_channel() {
        let text = two_joint_text(1, 6).replace("Yposition", "Wposition");
        assert!(matches!(
            parse(&text),
            Err(ParseError::UnknownChannel { line: 5, .. })
        ));
    }

    #[test]
    fn test_custom_channel_layout() {
        let text = "HIERARCHY
ROOT Root
{
  OFFSET 0 0 0
  CHANNELS 2 Yrotation Xposition
  End Site
  {
    OFFSET 0 0 1
  }
}
MOTION
Frames:2
Frame Time: 0.1
10 1
20 2
";
        let motion = parse(text).unwrap();
        assert_eq!(motion.hierarchy.channel_count(), 2);
        assert_eq!(motion.clip.values(), &[10.0, 1.0, 20.0, 2.0]);
        assert_eq!(motion.clip.fps(), 10);
    }

    #[test]
    fn test_bad_number_in_motion() {
        let text = two_joint_text(1, 6).replace("\n0 1 2", "\n0 x 2");
        assert!(matches!(
            parse(&text),
            Err(ParseError::BadNumber { line: 19, .. })
        ));
    }

    #[test]
    fn test_negative_frame_time() {
        let text = two_joint_text(1, 6).replace("Frame Time: 0.033333", "Frame Time: -1");
        assert!(matches!(
            parse(&text),
            Err(ParseError::BadFrameTime { line: 18, .. })
        ));
    }
}
