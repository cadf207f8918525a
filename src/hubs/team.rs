//! 基于 LLM 的团队 Hub
//!
//! 团队由若干成员（名称、角色、目标、指令）组成，按 coordinate 模式运行：
//! 成员依次发言，每个成员都能看到任务本身和此前成员的产出，最终合并所有产出作为结果。

use std::sync::Arc;

use async_trait::async_trait;

use crate::core::ExchangeError;
use crate::hubs::{Hub, Team};
use crate::llm::{LlmClient, Message};

/// 静态成员定义（内置表使用）
#[derive(Debug, Clone, Copy)]
pub struct MemberSpec {
    pub name: &'static str,
    pub role: &'static str,
    pub goal: &'static str,
    pub instructions: &'static [&'static str],
}

/// 静态团队定义
#[derive(Debug, Clone, Copy)]
pub struct TeamSpec {
    /// 实现类名（hubs_config.json 中的 hub_class）
    pub class: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub capabilities: &'static [&'static str],
    pub team_name: &'static str,
    /// 成员使用的模型；None 时沿用共享客户端的模型
    pub model: Option<&'static str>,
    pub members: &'static [MemberSpec],
}

/// 运行期成员
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TeamMember {
    pub name: String,
    pub role: String,
    pub goal: String,
    pub instructions: Vec<String>,
}

impl TeamMember {
    pub fn new(name: impl Into<String>, role: impl Into<String>, goal: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            role: role.into(),
            goal: goal.into(),
            instructions: Vec::new(),
        }
    }

    pub fn with_instructions(mut self, instructions: Vec<String>) -> Self {
        self.instructions = instructions;
        self
    }

    fn system_prompt(&self, team_name: &str) -> String {
        let mut prompt = format!(
            "你是「{}」的成员「{}」。\n角色：{}\n目标：{}",
            team_name, self.name, self.role, self.goal
        );
        if !self.instructions.is_empty() {
            prompt.push_str("\n\n工作要求：");
            for line in &self.instructions {
                prompt.push_str("\n- ");
                prompt.push_str(line);
            }
        }
        prompt
    }
}

impl From<&MemberSpec> for TeamMember {
    fn from(spec: &MemberSpec) -> Self {
        TeamMember::new(spec.name, spec.role, spec.goal)
            .with_instructions(spec.instructions.iter().map(|s| s.to_string()).collect())
    }
}

/// coordinate 模式团队
pub struct PromptTeam {
    name: String,
    members: Vec<TeamMember>,
    llm: Arc<dyn LlmClient>,
}

impl PromptTeam {
    pub fn new(name: impl Into<String>, members: Vec<TeamMember>, llm: Arc<dyn LlmClient>) -> Self {
        Self {
            name: name.into(),
            members,
            llm,
        }
    }

    pub fn members(&self) -> &[TeamMember] {
        &self.members
    }

    fn member_messages(&self, member: &TeamMember, task: &str, done: &[(String, String)]) -> Vec<Message> {
        let mut user = format!("任务：{}", task);
        if !done.is_empty() {
            user.push_str("\n\n团队成员已完成的工作：");
            for (name, content) in done {
                user.push_str(&format!("\n\n【{}】\n{}", name, content));
            }
        }
        vec![
            Message::system(member.system_prompt(&self.name)),
            Message::user(user),
        ]
    }
}

#[async_trait]
impl Team for PromptTeam {
    async fn run(&self, task: &str) -> Result<Option<String>, ExchangeError> {
        let mut contributions: Vec<(String, String)> = Vec::with_capacity(self.members.len());
        for member in &self.members {
            let messages = self.member_messages(member, task, &contributions);
            tracing::debug!(team = %self.name, member = %member.name, "member turn");
            let reply = self
                .llm
                .complete(&messages)
                .await
                .map_err(|e| ExchangeError::Execution(format!("{}: {}", member.name, e)))?;
            contributions.push((member.name.clone(), reply.trim().to_string()));
        }

        if contributions.iter().all(|(_, c)| c.is_empty()) {
            return Ok(None);
        }
        let combined = contributions
            .iter()
            .filter(|(_, c)| !c.is_empty())
            .map(|(name, c)| format!("## {}\n\n{}", name, c))
            .collect::<Vec<_>>()
            .join("\n\n");
        Ok(Some(combined))
    }
}

/// 由团队定义构造的 Hub
pub struct TeamHub {
    name: String,
    description: String,
    capabilities: Vec<String>,
    team_name: String,
    members: Vec<TeamMember>,
    llm: Arc<dyn LlmClient>,
}

impl TeamHub {
    pub fn from_spec(spec: &TeamSpec, llm: Arc<dyn LlmClient>) -> Self {
        let llm = match spec.model.and_then(|model| llm.for_model(model)) {
            Some(switched) => {
                tracing::debug!(hub = spec.class, model = ?spec.model, "team model override");
                switched
            }
            None => llm,
        };
        Self {
            name: spec.name.to_string(),
            description: spec.description.to_string(),
            capabilities: spec.capabilities.iter().map(|s| s.to_string()).collect(),
            team_name: spec.team_name.to_string(),
            members: spec.members.iter().map(TeamMember::from).collect(),
            llm,
        }
    }
}

#[async_trait]
impl Hub for TeamHub {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn get_capabilities(&self) -> Vec<String> {
        self.capabilities.clone()
    }

    async fn setup_team(&self) -> Result<Box<dyn Team>, ExchangeError> {
        if self.members.is_empty() {
            return Err(ExchangeError::Instantiation(format!(
                "{}: team has no members",
                self.name
            )));
        }
        Ok(Box::new(PromptTeam::new(
            self.team_name.clone(),
            self.members.clone(),
            self.llm.clone(),
        )))
    }
}
