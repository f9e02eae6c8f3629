use async_trait::async_trait;
use futures::StreamExt;
use lapin::{
    message::Delivery,
    options::*,
    types::{AMQPValue, FieldTable, LongString, ShortString},
    Channel, Connection, ConnectionProperties, Consumer, ExchangeKind,
};
use tracing::{debug, info, warn};

use adaptation_core::{
    config::BrokerSettings, Acknowledger, AdaptationError, HeaderValue, InboundMessage,
    MessageSource, Result, EXCHANGE_NAME, QUEUE_NAME, ROUTING_KEY,
};

/// RabbitMQ拓扑：连接、通道以及交换机/队列/绑定
pub struct RabbitMQTopology {
    connection: Connection,
    channel: Channel,
}

impl RabbitMQTopology {
    /// 连接broker并声明拓扑，任何一步失败都直接返回错误
    pub async fn connect(url: &str, settings: &BrokerSettings) -> Result<Self> {
        let connection = Connection::connect(url, ConnectionProperties::default())
            .await
            .map_err(|e| AdaptationError::MessageQueue(format!("连接RabbitMQ失败: {e}")))?;

        let channel = connection
            .create_channel()
            .await
            .map_err(|e| AdaptationError::MessageQueue(format!("创建通道失败: {e}")))?;

        channel
            .basic_qos(settings.prefetch_count, BasicQosOptions::default())
            .await
            .map_err(|e| AdaptationError::MessageQueue(format!("设置预取数量失败: {e}")))?;

        let topology = Self {
            connection,
            channel,
        };
        topology.declare(settings).await?;

        Ok(topology)
    }

    /// 声明交换机、队列并绑定
    async fn declare(&self, settings: &BrokerSettings) -> Result<()> {
        self.channel
            .exchange_declare(
                EXCHANGE_NAME,
                ExchangeKind::Direct,
                ExchangeDeclareOptions {
                    durable: true,
                    ..Default::default()
                },
                FieldTable::default(),
            )
            .await
            .map_err(|e| {
                AdaptationError::MessageQueue(format!("声明交换机 {EXCHANGE_NAME} 失败: {e}"))
            })?;

        self.channel
            .queue_declare(
                QUEUE_NAME,
                QueueDeclareOptions {
                    durable: false,
                    exclusive: false,
                    auto_delete: false,
                    ..Default::default()
                },
                queue_arguments(settings),
            )
            .await
            .map_err(|e| AdaptationError::MessageQueue(format!("声明队列 {QUEUE_NAME} 失败: {e}")))?;

        self.channel
            .queue_bind(
                QUEUE_NAME,
                EXCHANGE_NAME,
                ROUTING_KEY,
                QueueBindOptions::default(),
                FieldTable::default(),
            )
            .await
            .map_err(|e| AdaptationError::MessageQueue(format!("绑定队列 {QUEUE_NAME} 失败: {e}")))?;

        info!(
            exchange = EXCHANGE_NAME,
            queue = QUEUE_NAME,
            routing_key = ROUTING_KEY,
            "RabbitMQ拓扑声明完成"
        );
        Ok(())
    }

    /// 注册消费者，使用显式确认
    pub async fn consume(&self, consumer_tag: &str) -> Result<RabbitMQMessageSource> {
        let consumer = self
            .channel
            .basic_consume(
                QUEUE_NAME,
                consumer_tag,
                BasicConsumeOptions {
                    no_ack: false,
                    ..Default::default()
                },
                FieldTable::default(),
            )
            .await
            .map_err(|e| AdaptationError::MessageQueue(format!("注册消费者失败: {e}")))?;

        debug!("为队列 {} 创建消费者: {}", QUEUE_NAME, consumer_tag);
        Ok(RabbitMQMessageSource { consumer })
    }

    pub fn acknowledger(&self) -> RabbitMQAcknowledger {
        RabbitMQAcknowledger {
            channel: self.channel.clone(),
        }
    }

    /// 获取连接状态
    pub fn is_connected(&self) -> bool {
        self.connection.status().connected()
    }

    /// 关闭通道和连接
    pub async fn close(&self) -> Result<()> {
        if let Err(e) = self.channel.close(200, "正常关闭").await {
            warn!("关闭通道失败: {e}");
        }

        self.connection
            .close(200, "正常关闭")
            .await
            .map_err(|e| AdaptationError::MessageQueue(format!("关闭连接失败: {e}")))?;

        info!("RabbitMQ连接已关闭");
        Ok(())
    }
}

fn queue_arguments(settings: &BrokerSettings) -> FieldTable {
    let mut arguments = FieldTable::default();
    if let Some(exchange) = &settings.dead_letter_exchange {
        arguments.insert(
            ShortString::from("x-dead-letter-exchange"),
            AMQPValue::LongString(LongString::from(exchange.as_str())),
        );
    }
    arguments
}

/// 基于lapin消费者的消息来源
pub struct RabbitMQMessageSource {
    consumer: Consumer,
}

#[async_trait]
impl MessageSource for RabbitMQMessageSource {
    async fn next_message(&mut self) -> Option<Result<InboundMessage>> {
        let delivery = self.consumer.next().await?;
        Some(
            delivery
                .map(|delivery| inbound_message(&delivery))
                .map_err(|e| AdaptationError::MessageQueue(format!("接收消息失败: {e}"))),
        )
    }
}

/// 通过通道按投递标签确认消息
#[derive(Clone)]
pub struct RabbitMQAcknowledger {
    channel: Channel,
}

#[async_trait]
impl Acknowledger for RabbitMQAcknowledger {
    async fn ack(&self, delivery_tag: u64) -> Result<()> {
        self.channel
            .basic_ack(delivery_tag, BasicAckOptions::default())
            .await
            .map_err(|e| AdaptationError::MessageQueue(format!("确认消息失败: {e}")))
    }

    async fn nack(&self, delivery_tag: u64, requeue: bool) -> Result<()> {
        self.channel
            .basic_nack(
                delivery_tag,
                BasicNackOptions {
                    multiple: false,
                    requeue,
                },
            )
            .await
            .map_err(|e| AdaptationError::MessageQueue(format!("拒绝消息失败: {e}")))
    }
}

/// 把lapin的投递转换为与broker无关的消息
pub fn inbound_message(delivery: &Delivery) -> InboundMessage {
    InboundMessage {
        delivery_tag: delivery.delivery_tag,
        headers: delivery
            .properties
            .headers()
            .as_ref()
            .map(convert_headers)
            .unwrap_or_default(),
        reply_to: delivery
            .properties
            .reply_to()
            .as_ref()
            .map(|reply_to| reply_to.as_str().to_string()),
        redelivered: delivery.redelivered,
    }
}

pub fn convert_headers(table: &FieldTable) -> std::collections::BTreeMap<String, HeaderValue> {
    table
        .inner()
        .iter()
        .map(|(key, value)| (key.as_str().to_string(), header_value(value)))
        .collect()
}

/// AMQP字段值到消息头值的映射，长短字符串都视为字符串
pub fn header_value(value: &AMQPValue) -> HeaderValue {
    match value {
        AMQPValue::LongString(s) => match std::str::from_utf8(s.as_bytes()) {
            Ok(text) => HeaderValue::String(text.to_string()),
            Err(_) => HeaderValue::Bytes(s.as_bytes().to_vec()),
        },
        AMQPValue::ShortString(s) => HeaderValue::String(s.as_str().to_string()),
        AMQPValue::Boolean(b) => HeaderValue::Bool(*b),
        AMQPValue::ShortShortInt(v) => HeaderValue::Int(i64::from(*v)),
        AMQPValue::ShortShortUInt(v) => HeaderValue::Int(i64::from(*v)),
        AMQPValue::ShortInt(v) => HeaderValue::Int(i64::from(*v)),
        AMQPValue::ShortUInt(v) => HeaderValue::Int(i64::from(*v)),
        AMQPValue::LongInt(v) => HeaderValue::Int(i64::from(*v)),
        AMQPValue::LongUInt(v) => HeaderValue::Int(i64::from(*v)),
        AMQPValue::LongLongInt(v) => HeaderValue::Int(*v),
        AMQPValue::Float(v) => HeaderValue::Float(f64::from(*v)),
        AMQPValue::Double(v) => HeaderValue::Float(*v),
        other => HeaderValue::Other(format!("{:?}", other.get_type())),
    }
}
