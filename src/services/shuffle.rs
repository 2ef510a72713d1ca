//! 打乱服务 - 业务能力层
//!
//! 只负责"打乱题目和选项，并记录回到原始坐标的映射"，不关心会话状态

use rand::seq::SliceRandom;
use rand::Rng;

use crate::models::{PresentedQuestion, Question};

/// 打乱方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ShuffleMode {
    /// 题目顺序和每题选项顺序都打乱（答题模式）
    #[default]
    QuestionsAndOptions,
    /// 只打乱题目顺序，选项保持原样（闪卡模式）
    QuestionsOnly,
}

/// 打乱结果
///
/// - `index_map[presented] = original`
/// - `option_map[presented][presented_option] = original_option`
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ShuffleOutcome {
    pub presented: Vec<PresentedQuestion>,
    pub index_map: Vec<usize>,
    pub option_map: Vec<Vec<usize>>,
}

/// 打乱引擎
///
/// 题目列表和每道题的选项列表使用同一种 Fisher–Yates 洗牌
/// （`SliceRandom::shuffle`：从末尾向前，与 `[0, i]` 中均匀选出的位置交换）。
/// 每次加载都重新打乱，不保证可复现。
pub struct ShuffleEngine;

impl ShuffleEngine {
    pub fn shuffle<R: Rng + ?Sized>(
        questions: &[Question],
        mode: ShuffleMode,
        rng: &mut R,
    ) -> ShuffleOutcome {
        let mut presented: Vec<PresentedQuestion> = questions
            .iter()
            .enumerate()
            .map(|(original_index, question)| {
                let mut order: Vec<usize> = (0..question.options.len()).collect();
                if mode == ShuffleMode::QuestionsAndOptions {
                    order.shuffle(rng);
                }
                present(question, original_index, order)
            })
            .collect();

        presented.shuffle(rng);

        let index_map = presented.iter().map(|q| q.original_index).collect();
        let option_map = presented
            .iter()
            .map(|q| q.option_permutation.clone())
            .collect();

        ShuffleOutcome {
            presented,
            index_map,
            option_map,
        }
    }
}

/// 按给定排列生成呈现题目，并重新计算正确下标
fn present(question: &Question, original_index: usize, order: Vec<usize>) -> PresentedQuestion {
    let options = order
        .iter()
        .map(|&idx| question.options[idx].clone())
        .collect();

    // 原始正确下标非法或越界时找不到位置，即 "没有已知正确答案"
    let correct_index = question
        .valid_correct_index()
        .and_then(|orig| order.iter().position(|&idx| idx == orig));

    PresentedQuestion {
        question: question.question.clone(),
        options,
        correct_index,
        explanation: question.explanation.clone(),
        image: question.image.clone(),
        original_index,
        option_permutation: order,
    }
}
